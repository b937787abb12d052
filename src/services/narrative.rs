//! 叙述描述服务 - 业务能力层
//!
//! 固定提示词，以及从模型回答中提取估计坐标。

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{LatLng, NarrativeDescription};

/// 发送给视觉语言模型的固定提示词
pub const NARRATIVE_PROMPT: &str = "Analyze the image and describe what it primarily depicts: if it shows a person, give details about their appearance, identity (if known), attire, and activity; if it shows a place or landmark, describe it with relevant context and provide estimated coordinates in this format: Coordinates: latitude, longitude; if it shows another type of subject, describe it and provide relevant information.";

fn coordinates_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)coordinates[\s:*]*(-?\d{1,3}(?:\.\d+)?)\s*°?\s*([NS]\b)?\s*,\s*(-?\d{1,3}(?:\.\d+)?)\s*°?\s*([EW]\b)?")
            .expect("坐标正则表达式无效")
    })
}

/// 提取第一处 `Coordinates: <lat>, <lon>`
///
/// 支持 `48.85° N, 2.29° E` 这种带方位字母的写法；超出范围的坐标返回 None。
pub fn extract_coordinates(text: &str) -> Option<LatLng> {
    let caps = coordinates_regex().captures(text)?;

    let mut latitude: f64 = caps.get(1)?.as_str().parse().ok()?;
    let mut longitude: f64 = caps.get(3)?.as_str().parse().ok()?;

    if caps.get(2).is_some_and(|m| m.as_str().eq_ignore_ascii_case("S")) {
        latitude = -latitude.abs();
    }
    if caps.get(4).is_some_and(|m| m.as_str().eq_ignore_ascii_case("W")) {
        longitude = -longitude.abs();
    }

    let coordinates = LatLng::new(latitude, longitude);
    coordinates.is_valid().then_some(coordinates)
}

/// 将模型返回的文本整理为叙述描述
pub fn to_description(text: String) -> NarrativeDescription {
    let estimated_coordinates = extract_coordinates(&text);
    NarrativeDescription {
        text,
        estimated_coordinates,
    }
}
