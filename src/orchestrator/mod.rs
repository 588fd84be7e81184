//! Couche orchestration : ordre des étapes et regroupement des pages

pub mod bundle;
pub mod correction;

pub use bundle::{group_bundle, group_pages, BundlePage, StudentGroup, COPY_PAGE_JOIN};
pub use correction::{run_correction, CorrectionContext};
