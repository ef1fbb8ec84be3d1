//! Antigüedad, edad y dotación a una fecha.

use crate::modelo::EmpleadoRegistro;
use chrono::NaiveDate;

/// Días de un año para antigüedad y edad.
pub const DIAS_POR_ANIO: f64 = 365.25;

/// Años fraccionarios entre dos fechas. Si falta alguna devuelve 0.
pub fn anios_entre(desde: Option<NaiveDate>, hasta: Option<NaiveDate>) -> f64 {
    match (desde, hasta) {
        (Some(a), Some(b)) => (b - a).num_days() as f64 / DIAS_POR_ANIO,
        _ => 0.0,
    }
}

/// Antigüedad en años a la fecha indicada.
pub fn antiguedad(registro: &EmpleadoRegistro, al: Option<NaiveDate>) -> f64 {
    anios_entre(registro.fecha_ingreso, al)
}

/// Edad en años a la fecha indicada.
pub fn edad(registro: &EmpleadoRegistro, al: Option<NaiveDate>) -> f64 {
    anios_entre(registro.fecha_nacimiento, al)
}

/// Fecha en formato DD/MM/AAAA, vacío si no hay fecha.
pub fn formatear_fecha(fecha: Option<NaiveDate>) -> String {
    fecha
        .map(|f| f.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

/// Indica si un registro estaba activo al cierre del día `corte`.
///
/// Reconstruye la dotación histórica a partir de la consulta actual: el
/// empleado había ingresado y, o sigue activo, o su egreso corregido es
/// posterior al corte.
pub fn activo_al(registro: &EmpleadoRegistro, corte: NaiveDate) -> bool {
    let ingreso = match registro.fecha_ingreso {
        Some(f) => f,
        None => return false,
    };
    if ingreso > corte {
        return false;
    }
    if registro.estado.es_activo() {
        return true;
    }
    matches!(registro.fecha_egreso(), Some(egreso) if egreso > corte)
}

/// Registros activos a una fecha de corte.
pub fn activos_a_fecha(registros: &[EmpleadoRegistro], corte: NaiveDate) -> Vec<&EmpleadoRegistro> {
    registros.iter().filter(|r| activo_al(r, corte)).collect()
}
