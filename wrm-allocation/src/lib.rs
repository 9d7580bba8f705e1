//! Crop water demand and reservoir allocation recommendations.
//!
//! [`DemandCalculator`] turns a crop, its growth stage, field size and
//! irrigation method into liters per day, and combines that demand with a
//! reservoir forecast into an [`AllocationRecommendation`].

pub mod crops;
pub mod demand;
pub mod error;
pub mod irrigation;
pub mod recommend;

pub use crops::{CropProfile, CropTable, GrowthStage};
pub use demand::DemandCalculator;
pub use error::{AllocationError, CropTableError};
pub use irrigation::{AllocationConfig, IrrigationMethod};
pub use recommend::{
    AllocationRecommendation, AllocationStatus, RecommendationRequest, ReservoirOutlook,
};
