use crate::error::{Error, Result};

/// EPSG code of the canonical CRS (WGS84 longitude/latitude, degrees).
pub const WGS84: u32 = 4326;

/// PROJ.4 definition of one supported EPSG code.
#[derive(Debug, Clone, PartialEq)]
pub struct CrsDef {
    pub epsg: u32,
    pub name: String,
    pub proj4: String,
    /// Geographic definitions take radians in proj4rs; callers convert degrees.
    pub geographic: bool,
}

impl CrsDef {
    fn geographic(epsg: u32, name: &str, proj4: &str) -> Self {
        Self { epsg, name: name.to_string(), proj4: proj4.to_string(), geographic: true }
    }

    fn projected(epsg: u32, name: String, proj4: String) -> Self {
        Self { epsg, name, proj4, geographic: false }
    }
}

/// UTM zone definition on a given datum.
fn utm(zone: u32, south: bool, datum: &str) -> String {
    let south = if south { " +south" } else { "" };
    format!("+proj=utm +zone={zone}{south} {datum} +units=m +no_defs")
}

const ARC_1950: &str = "+ellps=clrk80 +towgs84=-143,-90,-294,0,0,0,0";
const ARC_1960: &str = "+ellps=clrk80 +towgs84=-160,-6,-302,0,0,0,0";

/// Look up the PROJ.4 definition of an EPSG code.
pub fn lookup(epsg: u32) -> Result<CrsDef> {
    let def = match epsg {
        4326 => CrsDef::geographic(epsg, "WGS 84", "+proj=longlat +datum=WGS84 +no_defs"),
        4269 => CrsDef::geographic(epsg, "NAD83", "+proj=longlat +datum=NAD83 +no_defs"),
        3857 => CrsDef::projected(epsg, "WGS 84 / Pseudo-Mercator".to_string(),
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs".to_string()),
        32601..=32660 => {
            let zone = epsg - 32600;
            CrsDef::projected(epsg, format!("WGS 84 / UTM zone {zone}N"), utm(zone, false, "+datum=WGS84"))
        }
        32701..=32760 => {
            let zone = epsg - 32700;
            CrsDef::projected(epsg, format!("WGS 84 / UTM zone {zone}S"), utm(zone, true, "+datum=WGS84"))
        }
        20935 | 20936 => {
            let zone = epsg - 20900;
            CrsDef::projected(epsg, format!("Arc 1950 / UTM zone {zone}S"), utm(zone, true, ARC_1950))
        }
        21035..=21037 => {
            let zone = epsg - 21000;
            CrsDef::projected(epsg, format!("Arc 1960 / UTM zone {zone}S"), utm(zone, true, ARC_1960))
        }
        21095..=21097 => {
            let zone = epsg - 21060;
            CrsDef::projected(epsg, format!("Arc 1960 / UTM zone {zone}N"), utm(zone, false, ARC_1960))
        }
        _ => return Err(Error::UnsupportedCrs(epsg)),
    };
    Ok(def)
}
