//! Tipos de reporte, rangos por defecto y filtro de movimientos por período.

use crate::error::{Advertencia, ErrorReporte, Resultado};
use crate::modelo::{Alta, Baja, Categoria, EmpleadoRegistro};
use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipoReporte {
    Diario,
    Semanal,
    Mensual,
    Anual,
}

impl TipoReporte {
    pub const TODOS: [TipoReporte; 4] = [
        TipoReporte::Diario,
        TipoReporte::Semanal,
        TipoReporte::Mensual,
        TipoReporte::Anual,
    ];

    /// Rango de fechas que se propone para el tipo de reporte.
    pub fn rango_por_defecto(&self, hoy: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            TipoReporte::Diario => (hoy, hoy),
            TipoReporte::Semanal => (hoy - Duration::days(7), hoy),
            TipoReporte::Mensual => {
                let inicio = hoy.with_day(1).unwrap_or(hoy);
                (inicio, ultimo_dia_del_mes(hoy))
            }
            TipoReporte::Anual => (
                NaiveDate::from_ymd_opt(hoy.year(), 1, 1).unwrap_or(hoy),
                NaiveDate::from_ymd_opt(hoy.year(), 12, 31).unwrap_or(hoy),
            ),
        }
    }

    /// El diario compara dos nóminas; el resto recorre fechas de una sola.
    pub fn usa_comparacion(&self) -> bool {
        matches!(self, TipoReporte::Diario)
    }

    pub fn titulo(&self) -> &'static str {
        match self {
            TipoReporte::Diario => "Reporte Diario de Dotación",
            TipoReporte::Semanal => "Reporte Semanal de Dotación",
            TipoReporte::Mensual => "Reporte Mensual de Dotación",
            TipoReporte::Anual => "Reporte Anual de Dotación",
        }
    }
}

impl fmt::Display for TipoReporte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let texto = match self {
            TipoReporte::Diario => "Diario",
            TipoReporte::Semanal => "Semanal",
            TipoReporte::Mensual => "Mensual",
            TipoReporte::Anual => "Anual",
        };
        f.write_str(texto)
    }
}

impl FromStr for TipoReporte {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "diario" | "daily" => Ok(TipoReporte::Diario),
            "semanal" | "weekly" => Ok(TipoReporte::Semanal),
            "mensual" | "monthly" => Ok(TipoReporte::Mensual),
            "anual" | "yearly" => Ok(TipoReporte::Anual),
            otro => Err(format!(
                "Tipo de reporte desconocido: '{}' (diario, semanal, mensual, anual)",
                otro
            )),
        }
    }
}

fn ultimo_dia_del_mes(fecha: NaiveDate) -> NaiveDate {
    let (anio, mes) = if fecha.month() == 12 {
        (fecha.year() + 1, 1)
    } else {
        (fecha.year(), fecha.month() + 1)
    };
    NaiveDate::from_ymd_opt(anio, mes, 1)
        .and_then(|f| f.pred_opt())
        .unwrap_or(fecha)
}

/// Fecha ingresada por el usuario: DD/MM/AAAA o AAAA-MM-DD.
pub fn parsear_fecha(texto: &str) -> Option<NaiveDate> {
    let texto = texto.trim();
    NaiveDate::parse_from_str(texto, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(texto, "%Y-%m-%d"))
        .ok()
}

/// Rechaza rangos con el inicio posterior al fin.
pub fn validar_rango(inicio: NaiveDate, fin: NaiveDate) -> Resultado<()> {
    if inicio > fin {
        return Err(ErrorReporte::RangoInvalido { inicio, fin });
    }
    Ok(())
}

fn en_rango(fecha: Option<NaiveDate>, inicio: NaiveDate, fin: NaiveDate) -> bool {
    matches!(fecha, Some(f) if f >= inicio && f <= fin)
}

/// Movimientos de un período.
#[derive(Debug, Clone, Default)]
pub struct MovimientosPeriodo {
    pub altas: Vec<Alta>,
    pub bajas: Vec<Baja>,
}

/// Altas por fecha de ingreso y bajas por fecha de egreso corregida, ambas
/// dentro de `[inicio, fin]`.
pub fn filtrar_por_periodo(
    registros: &[EmpleadoRegistro],
    inicio: NaiveDate,
    fin: NaiveDate,
) -> Resultado<MovimientosPeriodo> {
    validar_rango(inicio, fin)?;

    let altas: Vec<Alta> = registros
        .iter()
        .filter(|r| en_rango(r.fecha_ingreso, inicio, fin))
        .map(|r| Alta::new(r.clone()))
        .collect();

    let bajas: Vec<Baja> = registros
        .iter()
        .filter_map(Baja::desde_registro)
        .filter(|b| en_rango(b.fecha_egreso, inicio, fin))
        .collect();

    info!(
        "Período {} a {}: {} altas, {} bajas",
        inicio,
        fin,
        altas.len(),
        bajas.len()
    );

    Ok(MovimientosPeriodo { altas, bajas })
}

/// Vuelve a filtrar bajas ya corregidas. No aplica la corrección de nuevo.
pub fn bajas_en_rango(bajas: &[Baja], inicio: NaiveDate, fin: NaiveDate) -> Vec<Baja> {
    bajas
        .iter()
        .filter(|b| en_rango(b.fecha_egreso, inicio, fin))
        .cloned()
        .collect()
}

/// En el reporte anual todas las altas se informan bajo una misma categoría.
///
/// Con `conservar_original` la categoría previa queda en
/// `Alta::categoria_original`. Devuelve una advertencia si cambió alguna alta.
pub fn normalizar_categoria_anual(
    altas: &mut [Alta],
    categoria: &Categoria,
    conservar_original: bool,
) -> Option<Advertencia> {
    let mut cantidad = 0;
    for alta in altas.iter_mut() {
        let original = std::mem::replace(&mut alta.registro.categoria, categoria.clone());
        if &original != categoria {
            cantidad += 1;
        }
        if conservar_original {
            alta.categoria_original = Some(original);
        }
    }

    debug!("Normalización anual: {} altas recategorizadas", cantidad);

    if cantidad == 0 {
        None
    } else {
        Some(Advertencia::NormalizacionAnual {
            cantidad,
            categoria: categoria.clone(),
        })
    }
}
