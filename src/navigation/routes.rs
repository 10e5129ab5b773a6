//! Typed routing table.

use std::fmt;

use thiserror::Error;

use crate::session::HandleId;

/// Screen names and their path patterns
pub const ROUTE_TABLE: [(RouteName, &str); 3] = [
    (RouteName::FileManager, "file_manager"),
    (RouteName::Viewer, "viewer/{document}"),
    (RouteName::Editor, "editor/{document}"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    FileManager,
    Viewer,
    Editor,
}

impl RouteName {
    pub fn pattern(self) -> &'static str {
        ROUTE_TABLE
            .iter()
            .find(|(name, _)| *name == self)
            .map(|(_, pattern)| *pattern)
            .unwrap_or_default()
    }

    fn segment(self) -> &'static str {
        let pattern = self.pattern();
        pattern.split('/').next().unwrap_or(pattern)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerParams {
    pub document: HandleId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorParams {
    pub document: HandleId,
}

/// A screen together with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    FileManager,
    Viewer(ViewerParams),
    Editor(EditorParams),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("unknown route '{0}'")]
    UnknownRoute(String),
    #[error("route '{route}' has invalid document id '{value}'")]
    InvalidDocument { route: String, value: String },
}

impl Route {
    pub fn name(&self) -> RouteName {
        match self {
            Route::FileManager => RouteName::FileManager,
            Route::Viewer(_) => RouteName::Viewer,
            Route::Editor(_) => RouteName::Editor,
        }
    }

    /// Document the screen operates on
    pub fn document(&self) -> Option<HandleId> {
        match self {
            Route::FileManager => None,
            Route::Viewer(params) => Some(params.document),
            Route::Editor(params) => Some(params.document),
        }
    }

    /// Encode as a path for hosts that route by string
    pub fn path(&self) -> String {
        match self.document() {
            Some(document) => format!("{}/{}", self.name().segment(), document),
            None => self.name().segment().to_string(),
        }
    }

    pub fn from_path(path: &str) -> Result<Self, RouteError> {
        let (segment, argument) = match path.split_once('/') {
            Some((segment, argument)) => (segment, Some(argument)),
            None => (path, None),
        };

        let name = ROUTE_TABLE
            .iter()
            .map(|(name, _)| *name)
            .find(|name| name.segment() == segment)
            .ok_or_else(|| RouteError::UnknownRoute(path.to_string()))?;

        let document = |argument: Option<&str>| -> Result<HandleId, RouteError> {
            let value = argument.unwrap_or_default();
            value.parse().map_err(|_| RouteError::InvalidDocument {
                route: segment.to_string(),
                value: value.to_string(),
            })
        };

        match name {
            RouteName::FileManager if argument.is_none() => Ok(Route::FileManager),
            RouteName::FileManager => Err(RouteError::UnknownRoute(path.to_string())),
            RouteName::Viewer => Ok(Route::Viewer(ViewerParams {
                document: document(argument)?,
            })),
            RouteName::Editor => Ok(Route::Editor(EditorParams {
                document: document(argument)?,
            })),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "6f1c1c3e-3f7b-4a55-9a44-2d0b5c1c9e21";

    #[test]
    fn test_paths_follow_route_table() {
        let document: HandleId = ID.parse().expect("valid id");
        assert_eq!(Route::FileManager.path(), "file_manager");
        assert_eq!(
            Route::Viewer(ViewerParams { document }).path(),
            format!("viewer/{}", ID)
        );
        assert_eq!(RouteName::Editor.pattern(), "editor/{document}");
    }

    #[test]
    fn test_parse_viewer_route() {
        let route = Route::from_path(&format!("viewer/{}", ID)).expect("valid route");
        assert_eq!(route.name(), RouteName::Viewer);
        assert_eq!(route.document().map(|d| d.to_string()), Some(ID.to_string()));
    }

    #[test]
    fn test_rejects_unknown_and_malformed_routes() {
        assert_eq!(
            Route::from_path("settings"),
            Err(RouteError::UnknownRoute("settings".to_string()))
        );
        assert!(matches!(
            Route::from_path("viewer/content%3A%2F%2Fdoc.pdf"),
            Err(RouteError::InvalidDocument { .. })
        ));
        assert!(matches!(
            Route::from_path("editor"),
            Err(RouteError::InvalidDocument { .. })
        ));
        assert!(Route::from_path("file_manager/extra").is_err());
    }
}
