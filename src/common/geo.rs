// src/common/geo.rs

use rust_decimal::{prelude::ToPrimitive, Decimal};

// Raio da Terra em metros
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Margem aceita entre a posição do cliente e a posição da visita.
pub const VISIT_MARGIN_M: f64 = 100.0;

/// Distância em metros entre dois pontos (fórmula de Haversine).
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1_r, lat2_r) = (lat1.to_radians(), lat2.to_radians());
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationCheck {
    pub valid: bool,
    pub distance_m: f64,
}

/// Compara a posição cadastrada do cliente com a capturada na visita.
/// Sem coordenadas de um dos lados não há como validar.
pub fn check_location(
    client: (Option<Decimal>, Option<Decimal>),
    visit: (Option<Decimal>, Option<Decimal>),
    margin_m: f64,
) -> Option<LocationCheck> {
    let (Some(c_lat), Some(c_lon)) = client else { return None };
    let (Some(v_lat), Some(v_lon)) = visit else { return None };

    let distance_m = haversine_m(
        c_lat.to_f64()?,
        c_lon.to_f64()?,
        v_lat.to_f64()?,
        v_lon.to_f64()?,
    );
    Some(LocationCheck { valid: distance_m <= margin_m, distance_m })
}
