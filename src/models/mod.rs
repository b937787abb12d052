pub mod analysis;
pub mod credentials;
pub mod image_payload;
pub mod map;
pub mod vision_response;

pub use analysis::{
    AggregateResult, AnalysisKind, AnnotatedImage, DetectedObject, DrawnPolygon, Landmark, LatLng,
    Logo, NarrativeDescription, NormalizedVertex, OcrOutcome, WebEntity, WebImage, WebMatchResult,
    WebPage,
};
pub use credentials::{Credentials, NarrativeCredentials, VisionCredentials};
pub use image_payload::ImagePayload;
pub use map::{GeoMap, MapMarker, TileLayer, TILE_LAYERS};
pub use vision_response::AnnotateImageResponse;
