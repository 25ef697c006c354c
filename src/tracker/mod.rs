pub mod analyzer;
pub mod angle;
pub mod one_euro;

pub use analyzer::{JointAnalyzer, JointMeasurement};
pub use angle::{angle_degrees, AngleResult};
pub use one_euro::{Channel, ChannelFilterState, FilterBank, FilterParams};
