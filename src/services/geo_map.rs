//! 地理位置地图 - 业务能力层
//!
//! 根据地标结果构建 Leaflet 地图：以第一个地标为中心，每个地标一个标记，
//! 并叠加一组固定的可切换瓦片图层（默认激活第一个）。

use tera::{Context, Tera};

use crate::error::AppResult;
use crate::models::{GeoMap, Landmark, MapMarker, TILE_LAYERS};

/// 构建地图，无地标时返回 None
pub fn build_map(landmarks: &[Landmark], zoom: u8) -> Option<GeoMap> {
    let first = landmarks.first()?;

    Some(GeoMap {
        center: first.location,
        zoom,
        markers: landmarks
            .iter()
            .map(|landmark| MapMarker {
                position: landmark.location,
                tooltip: landmark.description.clone(),
            })
            .collect(),
        layers: TILE_LAYERS.to_vec(),
        active_layer: 0,
    })
}

const MAP_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map { height: 100%; margin: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
  var spec = {{ spec_json | safe }};
  var map = L.map("map").setView([spec.center.latitude, spec.center.longitude], spec.zoom);
  var baseLayers = {};
  spec.layers.forEach(function (layer, index) {
    var tile = L.tileLayer(layer.url_template, { attribution: layer.attribution, maxZoom: 19 });
    baseLayers[layer.name] = tile;
    if (index === spec.active_layer) { tile.addTo(map); }
  });
  spec.markers.forEach(function (marker) {
    L.marker([marker.position.latitude, marker.position.longitude])
      .bindTooltip(marker.tooltip)
      .addTo(map);
  });
  L.control.layers(baseLayers).addTo(map);
</script>
</body>
</html>
"#;

impl GeoMap {
    /// 渲染为独立的 Leaflet 页面
    pub fn to_html(&self) -> AppResult<String> {
        // `</` 转义后才能安全嵌入 <script>
        let spec_json = serde_json::to_string(self)?.replace("</", "<\\/");

        let mut context = Context::new();
        context.insert("spec_json", &spec_json);
        Ok(Tera::one_off(MAP_TEMPLATE, &context, false)?)
    }
}
