//! Invitely turns an invitation configuration and a theme into a single
//! self-contained static HTML document: assets inlined, markup pre-rendered
//! and a minified client bundle that hydrates it in the browser.

pub mod bundle;
pub mod document;
pub mod embed;
pub mod error;
pub mod minify;
pub mod render;
pub mod templates;
pub mod theme;
pub mod value;

// Re-export core types
pub use bundle::{PAYLOAD_ELEMENT_ID, ROOT_ELEMENT_ID, build_client_bundle};
pub use document::{assemble, read_payload};
pub use embed::{AssetEmbedder, AssetError, AssetSource, FsAssetSource, InMemoryAssetSource};
pub use error::{DataError, DocumentError, InvitelyError, RenderError, Result, ThemeError};
pub use render::{HydrationPayload, PROP_SOURCES, RenderOutput, RenderProps, render};
pub use theme::{Theme, ThemeId, ThemeMeta};
pub use value::InvitationConfig;
