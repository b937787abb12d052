//! Cloud Vision `images:annotate` 请求/响应结构
//!
//! 只声明用到的字段，其余字段由 serde 忽略。Vision 会省略值为 0 的坐标，
//! 因此坐标字段都带默认值。

use serde::{Deserialize, Serialize};

use crate::models::analysis::{
    DetectedObject, Landmark, LatLng, Logo, NormalizedVertex, WebEntity, WebImage, WebMatchResult,
    WebPage,
};

#[derive(Debug, Clone, Serialize)]
pub struct BatchAnnotateRequest {
    pub requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotateImageRequest {
    pub image: ImageContent,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageContent {
    /// base64 编码后的图片
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchAnnotateResponse {
    #[serde(default)]
    pub responses: Vec<AnnotateImageResponse>,
}

/// 单张图片的标注结果
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageResponse {
    #[serde(default)]
    pub landmark_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub logo_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub localized_object_annotations: Vec<LocalizedObjectAnnotation>,
    #[serde(default)]
    pub text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub web_detection: Option<WebDetection>,
    #[serde(default)]
    pub error: Option<Status>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAnnotation {
    #[serde(default)]
    pub mid: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub locations: Vec<LocationInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub lat_lng: Option<ApiLatLng>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApiLatLng {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedObjectAnnotation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingPoly {
    #[serde(default)]
    pub normalized_vertices: Vec<ApiNormalizedVertex>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApiNormalizedVertex {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebDetection {
    #[serde(default)]
    pub web_entities: Vec<ApiWebEntity>,
    #[serde(default)]
    pub pages_with_matching_images: Vec<ApiWebPage>,
    #[serde(default)]
    pub visually_similar_images: Vec<ApiWebImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiWebEntity {
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiWebPage {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub page_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiWebImage {
    #[serde(default)]
    pub url: String,
}

// ========== 转换为领域模型 ==========

impl AnnotateImageResponse {
    /// 地标列表，没有坐标的地标会被丢弃
    pub fn landmarks(&self) -> Vec<Landmark> {
        self.landmark_annotations
            .iter()
            .filter_map(|annotation| {
                let lat_lng = annotation
                    .locations
                    .iter()
                    .find_map(|location| location.lat_lng)?;
                Some(Landmark {
                    description: annotation.description.clone(),
                    location: LatLng::new(lat_lng.latitude, lat_lng.longitude),
                    score: annotation.score,
                })
            })
            .collect()
    }

    pub fn logos(&self) -> Vec<Logo> {
        self.logo_annotations
            .iter()
            .map(|annotation| Logo {
                description: annotation.description.clone(),
            })
            .collect()
    }

    pub fn objects(&self) -> Vec<DetectedObject> {
        self.localized_object_annotations
            .iter()
            .map(|annotation| DetectedObject {
                name: annotation.name.clone(),
                score: annotation.score,
                vertices: annotation
                    .bounding_poly
                    .as_ref()
                    .map(|poly| {
                        poly.normalized_vertices
                            .iter()
                            .map(|v| NormalizedVertex { x: v.x, y: v.y })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect()
    }

    pub fn web_matches(&self) -> WebMatchResult {
        let Some(web) = &self.web_detection else {
            return WebMatchResult::default();
        };

        WebMatchResult {
            entities: web
                .web_entities
                .iter()
                .map(|e| WebEntity {
                    entity_id: e.entity_id.clone(),
                    description: e.description.clone(),
                    score: e.score,
                })
                .collect(),
            matching_pages: web
                .pages_with_matching_images
                .iter()
                .map(|p| WebPage {
                    url: p.url.clone(),
                    page_title: p.page_title.clone(),
                })
                .collect(),
            similar_images: web
                .visually_similar_images
                .iter()
                .map(|i| WebImage { url: i.url.clone() })
                .collect(),
        }
    }

    /// 完整文本位于第一个文字标注中
    pub fn full_text(&self) -> Option<String> {
        self.text_annotations
            .first()
            .map(|annotation| annotation.description.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> AnnotateImageResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_landmark_without_location_is_dropped() {
        let response = parse(json!({
            "landmarkAnnotations": [
                {
                    "mid": "/m/02j81",
                    "description": "Eiffel Tower",
                    "score": 0.92,
                    "locations": [{ "latLng": { "latitude": 48.8584, "longitude": 2.2945 } }]
                },
                { "description": "Unknown place", "locations": [] }
            ]
        }));

        let landmarks = response.landmarks();
        assert_eq!(landmarks.len(), 1);
        assert_eq!(landmarks[0].description, "Eiffel Tower");
        assert_eq!(landmarks[0].location, LatLng::new(48.8584, 2.2945));
    }

    #[test]
    fn test_object_vertices_default_to_zero() {
        let response = parse(json!({
            "localizedObjectAnnotations": [{
                "name": "Bicycle",
                "score": 0.9,
                "boundingPoly": {
                    "normalizedVertices": [
                        {},
                        { "x": 0.5 },
                        { "x": 0.5, "y": 0.5 },
                        { "y": 0.5 }
                    ]
                }
            }]
        }));

        let objects = response.objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].vertices[0], NormalizedVertex { x: 0.0, y: 0.0 });
        assert_eq!(objects[0].vertices[3], NormalizedVertex { x: 0.0, y: 0.5 });
    }

    #[test]
    fn test_web_detection_and_full_text() {
        let response = parse(json!({
            "webDetection": {
                "webEntities": [{ "entityId": "/m/0", "description": "Paris", "score": 1.2 }],
                "pagesWithMatchingImages": [{ "url": "https://example.com/a", "pageTitle": "A" }],
                "visuallySimilarImages": [{ "url": "https://example.com/b.jpg" }]
            },
            "textAnnotations": [
                { "description": "HELLO\nWORLD" },
                { "description": "HELLO" }
            ]
        }));

        let web = response.web_matches();
        assert_eq!(web.entity_descriptions(), vec!["Paris"]);
        assert_eq!(web.page_urls(), vec!["https://example.com/a"]);
        assert_eq!(web.similar_image_urls(), vec!["https://example.com/b.jpg"]);
        assert_eq!(response.full_text().as_deref(), Some("HELLO\nWORLD"));
    }

    #[test]
    fn test_empty_response() {
        let response = parse(json!({}));
        assert!(response.landmarks().is_empty());
        assert!(!response.web_matches().has_any_match());
        assert!(response.full_text().is_none());
        assert!(response.error.is_none());
    }
}
