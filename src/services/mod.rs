//! Couche capacités : chaque service porte une aptitude du pipeline,
//! sans connaître l'ordre des étapes

pub mod grader;
pub mod hybrid_extract;
pub mod identity;
pub mod local_ocr;
pub mod page_raster;
pub mod quota;
pub mod rubric_extract;
pub mod segmenter;
pub mod usage;

pub use grader::{AiGrader, GradingRequest, QuestionGrader};
pub use hybrid_extract::{EngineMode, HybridExtractor, PAGE_BREAK};
pub use identity::{AiIdentityExtractor, Identity, IdentityExtractor, RegexIdentityExtractor};
pub use local_ocr::LocalOcr;
pub use page_raster::{PageRaster, RasterizedPages};
pub use quota::OcrQuota;
pub use rubric_extract::{ExtractedRubric, RubricExtractor, RubricTier};
pub use segmenter::{AnswerSegmenter, SegmentTier, SegmentedAnswers};
pub use usage::{Stage, StageUsage, UsageSnapshot, UsageTracker};
