pub mod camera;
pub mod directory;
pub mod error;
pub mod geo;
pub mod image_source;
pub mod polyline;
pub mod region;
pub mod weight;

pub use camera::{Camera, CameraView};
pub use directory::{cameras_in_box, CameraDirectory, HttpCameraDirectory};
pub use error::{ErrorKind, UpstreamError};
pub use geo::{haversine_km, Coordinate};
pub use image_source::{HttpImageSource, ImageSource};
pub use region::{filter_by_box, filter_by_radius, BoundingBox, NearbyCamera, Region};
pub use weight::TrafficWeightPolicy;
