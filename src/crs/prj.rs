use std::sync::LazyLock;

use regex::Regex;

use crate::crs::registry;

static AUTHORITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:AUTHORITY|ID)\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\]"#)
        .expect("valid EPSG authority pattern")
});

static UTM_ZONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"UTM_ZONE_(\d{1,2})([NS])").expect("valid UTM zone pattern")
});

/// Guess the EPSG code of an ESRI `.prj` / OGC WKT definition.
///
/// Tries, in order: the outermost EPSG authority code, a UTM zone name on a
/// known datum, Web Mercator, then plain geographic WGS84/NAD83. Only codes the
/// registry can transform are returned.
pub fn epsg_from_wkt(wkt: &str) -> Option<u32> {
    // The last authority in a WKT string belongs to the outermost CRS.
    let authority = AUTHORITY.captures_iter(wkt)
        .last()
        .and_then(|caps| caps[1].parse::<u32>().ok());
    if let Some(code) = authority.filter(|&code| registry::lookup(code).is_ok()) {
        return Some(code);
    }

    let normalized = wkt.to_uppercase().replace([' ', '-'], "_");
    let projected = normalized.contains("PROJCS") || normalized.contains("PROJCRS");

    if let Some(caps) = UTM_ZONE.captures(&normalized) {
        let zone: u32 = caps[1].parse().ok()?;
        let south = &caps[2] == "S";
        let code = if normalized.contains("ARC_1950") {
            20900 + zone
        } else if normalized.contains("ARC_1960") {
            if south { 21000 + zone } else { 21060 + zone }
        } else if normalized.contains("WGS_1984") || normalized.contains("WGS84") {
            if south { 32700 + zone } else { 32600 + zone }
        } else {
            return None;
        };
        return registry::lookup(code).ok().map(|def| def.epsg);
    }

    if ["MERCATOR_AUXILIARY_SPHERE", "PSEUDO_MERCATOR", "WEB_MERCATOR"].iter().any(|s| normalized.contains(s)) {
        return Some(3857);
    }

    if !projected {
        if normalized.contains("WGS_1984") || normalized.contains("WGS84") { return Some(4326); }
        if normalized.contains("NORTH_AMERICAN_1983") || normalized.contains("NAD83") { return Some(4269); }
    }

    None
}
