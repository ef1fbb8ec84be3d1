use crate::modelo::{Categoria, Legajo};
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Errores que abortan la generación de un reporte.
///
/// Ninguno es fatal para el proceso: el usuario puede corregir el archivo
/// y volver a intentar.
#[derive(Debug, Error)]
pub enum ErrorReporte {
    #[error("No se encontró la hoja '{hoja}'. Hojas disponibles: {}", .disponibles.join(", "))]
    HojaNoEncontrada {
        hoja: String,
        disponibles: Vec<String>,
    },

    #[error(
        "Faltan columnas en la hoja '{hoja}'. Esperadas: {}. Encontradas: {}",
        .esperadas.join(", "),
        .encontradas.join(", ")
    )]
    ColumnasFaltantes {
        hoja: String,
        esperadas: Vec<String>,
        encontradas: Vec<String>,
    },

    #[error("Rango de fechas inválido: el inicio ({inicio}) es posterior al fin ({fin})")]
    RangoInvalido { inicio: NaiveDate, fin: NaiveDate },

    #[error("No hay ningún archivo Excel cargado")]
    SinArchivo,

    #[error("Error al leer el Excel: {0}")]
    Excel(#[from] calamine::Error),

    #[error("Error al generar el PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Error de entrada/salida: {0}")]
    Io(#[from] std::io::Error),
}

pub type Resultado<T> = std::result::Result<T, ErrorReporte>;

/// Problemas de calidad de datos que no detienen el reporte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advertencia {
    /// Hoja de activos anterior ausente o sin legajos activos: todos los
    /// activos cuentan como altas.
    SinNominaAnterior { hoja: String },
    /// No hay hoja de cambios organizativos; se usan los datos viejos.
    SinHojaCambios { hoja: String, cantidad: usize },
    /// Legajos desaparecidos que la hoja de cambios no explica.
    LegajosSinCambio { hoja: String, legajos: Vec<Legajo> },
    /// Legajos repetidos en una hoja (gana la última fila).
    LegajosDuplicados { hoja: String, legajos: Vec<Legajo> },
    /// Altas recategorizadas por la normalización del reporte anual.
    NormalizacionAnual { cantidad: usize, categoria: Categoria },
}

impl fmt::Display for Advertencia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advertencia::SinNominaAnterior { hoja } => write!(
                f,
                "La hoja '{}' no existe o no tiene legajos activos: todos los activos se informan como altas y pueden incluir falsos ingresos",
                hoja
            ),
            Advertencia::SinHojaCambios { hoja, cantidad } => write!(
                f,
                "No se encontró la hoja '{}': {} cambios organizativos se informan con datos de la nómina anterior y pueden estar incompletos",
                hoja, cantidad
            ),
            Advertencia::LegajosSinCambio { hoja, legajos } => write!(
                f,
                "Legajos ausentes de la consulta base sin registro en la hoja '{}': {}",
                hoja,
                unir(legajos)
            ),
            Advertencia::LegajosDuplicados { hoja, legajos } => write!(
                f,
                "Legajos duplicados en la hoja '{}' (se toma la última fila): {}",
                hoja,
                unir(legajos)
            ),
            Advertencia::NormalizacionAnual {
                cantidad,
                categoria,
            } => write!(
                f,
                "Reporte anual: {} altas se informan con la categoría '{}'",
                cantidad, categoria
            ),
        }
    }
}

fn unir(legajos: &[Legajo]) -> String {
    legajos
        .iter()
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
