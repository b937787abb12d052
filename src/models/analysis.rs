//! 分析结果领域模型
//!
//! 每个字段独立成功或失败，任何一项缺失都不影响其余结果的展示。

use std::fmt;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::map::GeoMap;
use crate::error::{AnalysisCallError, DecodeError, NarrativeCallError};

/// 视觉分析类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// 地标识别
    Landmark,
    /// 商标识别
    Logo,
    /// 物体定位
    ObjectLocalization,
    /// 网络实体检测（反向图片搜索）
    WebDetection,
    /// 文字识别
    TextDetection,
}

impl AnalysisKind {
    /// Vision API 中的 feature 类型名
    pub fn feature_type(self) -> &'static str {
        match self {
            AnalysisKind::Landmark => "LANDMARK_DETECTION",
            AnalysisKind::Logo => "LOGO_DETECTION",
            AnalysisKind::ObjectLocalization => "OBJECT_LOCALIZATION",
            AnalysisKind::WebDetection => "WEB_DETECTION",
            AnalysisKind::TextDetection => "TEXT_DETECTION",
        }
    }

    /// 日志中使用的名称
    pub fn label(self) -> &'static str {
        match self {
            AnalysisKind::Landmark => "地标识别",
            AnalysisKind::Logo => "商标识别",
            AnalysisKind::ObjectLocalization => "物体定位",
            AnalysisKind::WebDetection => "网络实体检测",
            AnalysisKind::TextDetection => "文字识别",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 经纬度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// 是否在合法经纬度范围内
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// 识别出的地标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Landmark {
    pub description: String,
    pub location: LatLng,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// 识别出的商标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Logo {
    pub description: String,
}

/// 归一化坐标点，取值范围 [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedVertex {
    pub x: f32,
    pub y: f32,
}

/// 定位出的物体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedObject {
    pub name: String,
    /// 置信度 0.0 - 1.0
    pub score: f32,
    /// 边界多边形（有序）
    pub vertices: Vec<NormalizedVertex>,
}

impl DetectedObject {
    /// 标注文字，如 `Dog (87.3% Confidence)`
    pub fn label(&self) -> String {
        format!("{} ({:.1}% Confidence)", self.name, self.score * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebPage {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebImage {
    pub url: String,
}

/// 反向图片搜索结果
///
/// 三个列表保留服务端返回的原始条目（包括描述或 URL 为空的条目），
/// OCR 触发条件基于原始条目数量判断。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebMatchResult {
    pub entities: Vec<WebEntity>,
    pub matching_pages: Vec<WebPage>,
    pub similar_images: Vec<WebImage>,
}

impl WebMatchResult {
    /// 实体、匹配页面、相似图片中任一非空
    pub fn has_any_match(&self) -> bool {
        !self.entities.is_empty()
            || !self.matching_pages.is_empty()
            || !self.similar_images.is_empty()
    }

    /// 非空的实体描述
    pub fn entity_descriptions(&self) -> Vec<&str> {
        self.entities
            .iter()
            .map(|e| e.description.as_str())
            .filter(|d| !d.is_empty())
            .collect()
    }

    pub fn page_urls(&self) -> Vec<&str> {
        self.matching_pages.iter().map(|p| p.url.as_str()).collect()
    }

    /// 非空的相似图片 URL
    pub fn similar_image_urls(&self) -> Vec<&str> {
        self.similar_images
            .iter()
            .map(|i| i.url.as_str())
            .filter(|u| !u.is_empty())
            .collect()
    }
}

/// OCR 结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum OcrOutcome {
    /// 未执行（网络检测无任何匹配）
    Skipped,
    /// 已执行但未识别出文字
    NoText,
    /// 识别出的完整文本
    Text(String),
    /// 调用失败
    Failed(AnalysisCallError),
}

impl OcrOutcome {
    /// OCR 是否实际发起了调用
    pub fn was_attempted(&self) -> bool {
        !matches!(self, OcrOutcome::Skipped)
    }
}

/// 视觉语言模型给出的叙述描述
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeDescription {
    pub text: String,
    /// 从 `Coordinates: <lat>, <lon>` 行中解析出的估计坐标
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_coordinates: Option<LatLng>,
}

/// 标注图中的一个多边形
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawnPolygon {
    /// 像素坐标顶点
    pub vertices: Vec<(i32, i32)>,
    /// 实际绘制的边，最后一条边回到第一个顶点
    pub edges: Vec<((i32, i32), (i32, i32))>,
    pub label: String,
    /// 标注文字锚点（第一个顶点上方）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_anchor: Option<(i32, i32)>,
}

impl DrawnPolygon {
    /// 多边形是否闭合
    pub fn is_closed(&self) -> bool {
        match (self.edges.last(), self.vertices.first()) {
            (Some((_, end)), Some(first)) => end == first,
            _ => false,
        }
    }
}

/// 标注后的图片（RGB 顺序，独立于原始位图的副本）
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedImage {
    #[serde(skip)]
    pub image: RgbImage,
    pub width: u32,
    pub height: u32,
    pub polygons: Vec<DrawnPolygon>,
}

/// 单张图片的全部分析结果
///
/// 只在渲染一次响应期间存在，不做缓存。
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub landmarks: Result<Vec<Landmark>, AnalysisCallError>,
    pub logos: Result<Vec<Logo>, AnalysisCallError>,
    pub objects: Result<Vec<DetectedObject>, AnalysisCallError>,
    /// 无物体时为 None
    pub annotation: Option<Result<AnnotatedImage, DecodeError>>,
    pub web: Result<WebMatchResult, AnalysisCallError>,
    pub ocr: OcrOutcome,
    pub narrative: Result<NarrativeDescription, NarrativeCallError>,
    /// 无地标时为 None
    pub map: Option<GeoMap>,
}

impl AggregateResult {
    /// 所有远程分析调用是否都失败了
    pub fn all_failed(&self) -> bool {
        self.landmarks.is_err()
            && self.logos.is_err()
            && self.objects.is_err()
            && self.web.is_err()
            && self.narrative.is_err()
    }

    /// 统计失败的调用数量（含 OCR）
    pub fn failed_calls(&self) -> usize {
        [
            self.landmarks.is_err(),
            self.logos.is_err(),
            self.objects.is_err(),
            self.web.is_err(),
            matches!(self.ocr, OcrOutcome::Failed(_)),
            self.narrative.is_err(),
        ]
        .iter()
        .filter(|failed| **failed)
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_label_format() {
        let object = DetectedObject {
            name: "Dog".to_string(),
            score: 0.8734,
            vertices: vec![],
        };
        assert_eq!(object.label(), "Dog (87.3% Confidence)");
    }

    #[test]
    fn test_web_match_counts_raw_entries() {
        let web = WebMatchResult {
            entities: vec![WebEntity {
                entity_id: Some("/m/0".to_string()),
                description: String::new(),
                score: None,
            }],
            ..Default::default()
        };
        // 描述为空的实体仍然算作匹配
        assert!(web.has_any_match());
        assert!(web.entity_descriptions().is_empty());
        assert!(!WebMatchResult::default().has_any_match());
    }

    #[test]
    fn test_polygon_closed() {
        let polygon = DrawnPolygon {
            vertices: vec![(0, 0), (10, 0), (10, 10)],
            edges: vec![
                ((0, 0), (10, 0)),
                ((10, 0), (10, 10)),
                ((10, 10), (0, 0)),
            ],
            label: "Box (50.0% Confidence)".to_string(),
            label_anchor: Some((0, -10)),
        };
        assert!(polygon.is_closed());
    }

    #[test]
    fn test_latlng_range() {
        assert!(LatLng::new(48.8584, 2.2945).is_valid());
        assert!(!LatLng::new(91.0, 0.0).is_valid());
        assert!(!LatLng::new(0.0, -181.0).is_valid());
    }
}
