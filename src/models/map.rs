//! 地图数据结构
//!
//! 由 `services::geo_map` 构建与渲染，随 `AggregateResult` 一起序列化。

use serde::Serialize;

use super::analysis::LatLng;

/// 瓦片图层
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileLayer {
    pub name: &'static str,
    pub url_template: &'static str,
    pub attribution: &'static str,
}

const STADIA_ATTRIBUTION: &str = r#"&copy; <a href="https://www.stadiamaps.com/" target="_blank">Stadia Maps</a> &copy; <a href="https://openmaptiles.org/" target="_blank">OpenMapTiles</a> &copy; <a href="https://www.openstreetmap.org/copyright" target="_blank">OpenStreetMap</a>"#;
const CARTO_ATTRIBUTION: &str = r#"&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors &copy; <a href="https://carto.com/attributions">CARTO</a>"#;
const WAYMARKED_ATTRIBUTION: &str = r#"Map data: &copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors | Map style: &copy; <a href="https://waymarkedtrails.org">waymarkedtrails.org</a> (<a href="https://creativecommons.org/licenses/by-sa/3.0/">CC-BY-SA</a>)"#;

/// 固定的图层列表，顺序即展示顺序
pub const TILE_LAYERS: [TileLayer; 13] = [
    TileLayer {
        name: "OpenTopoMap",
        url_template: "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
        attribution: r#"Map data: &copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors, <a href="http://viewfinderpanoramas.org">SRTM</a> | Map style: &copy; <a href="https://opentopomap.org">OpenTopoMap</a> (<a href="https://creativecommons.org/licenses/by-sa/3.0/">CC-BY-SA</a>)"#,
    },
    TileLayer {
        name: "Stadia.AlidadeSmooth",
        url_template: "https://tiles.stadiamaps.com/tiles/alidade_smooth/{z}/{x}/{y}{r}.png",
        attribution: STADIA_ATTRIBUTION,
    },
    TileLayer {
        name: "Stadia.AlidadeSmoothDark",
        url_template: "https://tiles.stadiamaps.com/tiles/alidade_smooth_dark/{z}/{x}/{y}{r}.png",
        attribution: STADIA_ATTRIBUTION,
    },
    TileLayer {
        name: "Stadia.OSMBright",
        url_template: "https://tiles.stadiamaps.com/tiles/osm_bright/{z}/{x}/{y}{r}.png",
        attribution: STADIA_ATTRIBUTION,
    },
    TileLayer {
        name: "CartoDB.Positron",
        url_template: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
        attribution: CARTO_ATTRIBUTION,
    },
    TileLayer {
        name: "CartoDB.Voyager",
        url_template: "https://{s}.basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}{r}.png",
        attribution: CARTO_ATTRIBUTION,
    },
    TileLayer {
        name: "WaymarkedTrails.hiking",
        url_template: "https://tile.waymarkedtrails.org/hiking/{z}/{x}/{y}.png",
        attribution: WAYMARKED_ATTRIBUTION,
    },
    TileLayer {
        name: "WaymarkedTrails.cycling",
        url_template: "https://tile.waymarkedtrails.org/cycling/{z}/{x}/{y}.png",
        attribution: WAYMARKED_ATTRIBUTION,
    },
    TileLayer {
        name: "WaymarkedTrails.mtb",
        url_template: "https://tile.waymarkedtrails.org/mtb/{z}/{x}/{y}.png",
        attribution: WAYMARKED_ATTRIBUTION,
    },
    TileLayer {
        name: "WaymarkedTrails.slopes",
        url_template: "https://tile.waymarkedtrails.org/slopes/{z}/{x}/{y}.png",
        attribution: WAYMARKED_ATTRIBUTION,
    },
    TileLayer {
        name: "WaymarkedTrails.riding",
        url_template: "https://tile.waymarkedtrails.org/riding/{z}/{x}/{y}.png",
        attribution: WAYMARKED_ATTRIBUTION,
    },
    TileLayer {
        name: "WaymarkedTrails.skating",
        url_template: "https://tile.waymarkedtrails.org/skating/{z}/{x}/{y}.png",
        attribution: WAYMARKED_ATTRIBUTION,
    },
    TileLayer {
        name: "OpenRailwayMap",
        url_template: "https://{s}.tiles.openrailwaymap.org/standard/{z}/{x}/{y}.png",
        attribution: r#"Map data: &copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors | Map style: &copy; <a href="https://www.OpenRailwayMap.org">OpenRailwayMap</a> (<a href="https://creativecommons.org/licenses/by-sa/3.0/">CC-BY-SA</a>)"#,
    },
];

/// 地图标记
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub position: LatLng,
    pub tooltip: String,
}

/// 地图描述
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoMap {
    pub center: LatLng,
    pub zoom: u8,
    pub markers: Vec<MapMarker>,
    pub layers: Vec<TileLayer>,
    /// 默认激活的底图图层下标
    pub active_layer: usize,
}
