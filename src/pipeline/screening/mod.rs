//! Field transformation: extraction payload → screening indicators.
//!
//! ```text
//! ExtractionPayload ─▶ lookup strategies ─▶ per field:
//!     value coercion · provisional status · geometry · rule · context
//! ─▶ ScreeningResult { indicators, summary, pages }
//! ```

pub mod types;
pub mod payload;
pub mod geometry;
pub mod context;
pub mod rules;
pub mod transform;

pub use types::*;
pub use payload::{AnalyzerField, ExtractionPayload, RawSource, SourceRecord, TextSpan};
pub use geometry::{normalize_sources, normalize_sources_scaled, GeometryScale, POINTS_PER_INCH};
pub use context::extract_context;
pub use rules::{RuleBook, RuleBookError, ScreeningRule};
pub use transform::{confidence_label, indicator_id, transform_payload};
