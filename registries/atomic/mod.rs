pub(crate) mod renderer;

pub use renderer::{
    AssetRendererRegistry, RendererChoice, RendererPolicy, RendererSelection, UnsupportedAssetKind,
};
