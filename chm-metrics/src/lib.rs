pub mod config;
pub mod error;
pub mod extract;
pub mod growth;
pub mod stem_density;
pub mod summary;
pub mod table;

pub use config::MetricsConfig;
pub use error::MetricsError;
pub use extract::{extract, SiteRecord};
pub use growth::{growth_rates, rank, GrowthFilter, GrowthRecord};
pub use stem_density::{stem_density, stem_density_from_las};
pub use summary::{summary, ChmSummary};
