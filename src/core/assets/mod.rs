mod asset_index;

pub use asset_index::{
    install_assets, AssetIndex, AssetObject, AssetSummary, ASSET_PROGRESS_EVERY, RESOURCES_URL,
};
