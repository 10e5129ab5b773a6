//! Navigation between the file manager, viewer and editor screens.

pub mod navigator;
pub mod picker;
pub mod routes;

pub use navigator::{NavigationError, Navigator};
pub use picker::{DocumentPicker, FixedPicker, LinePicker, PickOutcome};
pub use routes::{EditorParams, Route, RouteError, RouteName, ViewerParams};
