//! The client's navigable surface and its session gating rules.
//!
//! Unauthenticated users may reach only the landing page (`/`) and the
//! sign-in page. Everything else redirects to sign-in, and sign-in itself
//! redirects home once a user is signed in.

use crate::types::DocId;

pub const PATH_ROOT: &str = "/";
pub const PATH_SIGN_IN: &str = "/signin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Landing page when signed out, public feed when signed in.
    Root,
    SignIn,
    Profile,
    Folders,
    FolderNotes(DocId),
    AddNote(Option<DocId>),
    NoteDetail(DocId),
}

/// Outcome of checking a route against the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Allow,
    Redirect(&'static str),
}

impl Route {
    /// Parse a request path. Trailing slashes are ignored.
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let route = match segments.as_slice() {
            [] => Self::Root,
            ["signin"] => Self::SignIn,
            ["profile"] => Self::Profile,
            ["folders"] => Self::Folders,
            ["folders", id] => Self::FolderNotes((*id).to_string()),
            ["add-note"] => Self::AddNote(None),
            ["add-note", folder_id] => Self::AddNote(Some((*folder_id).to_string())),
            ["note", id] => Self::NoteDetail((*id).to_string()),
            _ => return None,
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Self::Root => PATH_ROOT.to_string(),
            Self::SignIn => PATH_SIGN_IN.to_string(),
            Self::Profile => "/profile".to_string(),
            Self::Folders => "/folders".to_string(),
            Self::FolderNotes(id) => format!("/folders/{id}"),
            Self::AddNote(None) => "/add-note".to_string(),
            Self::AddNote(Some(folder_id)) => format!("/add-note/{folder_id}"),
            Self::NoteDetail(id) => format!("/note/{id}"),
        }
    }

    /// Whether the route needs a signed-in user.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::Root | Self::SignIn)
    }

    pub fn gate(&self, authenticated: bool) -> Gate {
        match (self, authenticated) {
            (Self::SignIn, true) => Gate::Redirect(PATH_ROOT),
            (route, false) if route.requires_auth() => Gate::Redirect(PATH_SIGN_IN),
            _ => Gate::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_route() {
        let cases = [
            ("/", Route::Root),
            ("/signin", Route::SignIn),
            ("/profile", Route::Profile),
            ("/folders", Route::Folders),
            ("/folders/f1", Route::FolderNotes("f1".into())),
            ("/add-note", Route::AddNote(None)),
            ("/add-note/f1", Route::AddNote(Some("f1".into()))),
            ("/note/n1", Route::NoteDetail("n1".into())),
        ];
        for (path, expected) in cases {
            let parsed = Route::parse(path).unwrap();
            assert_eq!(parsed, expected, "{path}");
            assert_eq!(parsed.path(), path);
        }
    }

    #[test]
    fn unknown_paths_do_not_parse() {
        assert_eq!(Route::parse("/admin"), None);
        assert_eq!(Route::parse("/note"), None);
        assert_eq!(Route::parse("/folders/a/b"), None);
    }

    #[test]
    fn trailing_slash_is_ignored() {
        assert_eq!(Route::parse("/folders/"), Some(Route::Folders));
    }

    #[test]
    fn signed_out_users_reach_only_landing_and_sign_in() {
        assert_eq!(Route::Root.gate(false), Gate::Allow);
        assert_eq!(Route::SignIn.gate(false), Gate::Allow);
        for route in [
            Route::Profile,
            Route::Folders,
            Route::FolderNotes("f".into()),
            Route::AddNote(None),
            Route::NoteDetail("n".into()),
        ] {
            assert_eq!(route.gate(false), Gate::Redirect(PATH_SIGN_IN), "{route:?}");
            assert_eq!(route.gate(true), Gate::Allow, "{route:?}");
        }
    }

    #[test]
    fn sign_in_redirects_home_when_signed_in() {
        assert_eq!(Route::SignIn.gate(true), Gate::Redirect(PATH_ROOT));
    }
}
