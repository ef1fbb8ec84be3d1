use crate::error::Resultado;
use crate::reporte::{Reporte, TablaDetalle, Valor};
use anyhow::{Context, Result};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::Datelike;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

/// Una hoja tal como sale del Excel: encabezados y celdas sin interpretar.
#[derive(Debug, Clone)]
pub struct TablaCruda {
    pub nombre: String,
    pub encabezados: Vec<String>,
    pub filas: Vec<Vec<Data>>,
}

/// Todas las hojas de un libro, leídas una sola vez.
#[derive(Debug, Clone, Default)]
pub struct Libro {
    pub hojas: Vec<TablaCruda>,
}

impl Libro {
    /// Lee un archivo Excel del disco
    pub fn abrir(ruta: &Path) -> Resultado<Self> {
        let bytes = std::fs::read(ruta)?;
        Self::desde_bytes(&bytes)
    }

    /// Lee un libro desde memoria (por ejemplo, un archivo subido)
    pub fn desde_bytes(bytes: &[u8]) -> Resultado<Self> {
        let mut workbook: Xlsx<_> =
            open_workbook_from_rs(Cursor::new(bytes)).map_err(calamine::Error::from)?;

        let nombres: Vec<String> = workbook.sheet_names().to_vec();
        let mut hojas = Vec::with_capacity(nombres.len());

        for nombre in &nombres {
            let range = match workbook.worksheet_range(nombre) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Se omite la hoja '{}': {}", nombre, e);
                    continue;
                }
            };

            // El encabezado es la primera fila con algún valor
            let mut filas = range
                .rows()
                .skip_while(|fila| fila.iter().all(celda_vacia));

            let encabezados: Vec<String> = match filas.next() {
                Some(fila) => fila.iter().map(|c| c.to_string()).collect(),
                None => Vec::new(),
            };

            let filas: Vec<Vec<Data>> = filas
                .filter(|fila| !fila.iter().all(celda_vacia))
                .map(|fila| fila.to_vec())
                .collect();

            debug!("Hoja '{}': {} filas", nombre, filas.len());

            hojas.push(TablaCruda {
                nombre: nombre.clone(),
                encabezados,
                filas,
            });
        }

        Ok(Libro { hojas })
    }

    /// Busca una hoja ignorando espacios y mayúsculas
    pub fn hoja(&self, nombre: &str) -> Option<&TablaCruda> {
        let buscado = nombre.trim().to_lowercase();
        self.hojas
            .iter()
            .find(|h| h.nombre.trim().to_lowercase() == buscado)
    }

    pub fn nombres(&self) -> Vec<String> {
        self.hojas.iter().map(|h| h.nombre.clone()).collect()
    }
}

fn celda_vacia(celda: &Data) -> bool {
    match celda {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Guarda el detalle de altas, bajas y cambios en un archivo Excel
pub fn guardar_detalle(reporte: &Reporte, ruta_salida: &Path) -> Result<()> {
    let mut workbook = detalle_workbook(reporte).context("Error al armar el Excel de detalle")?;
    workbook
        .save(ruta_salida)
        .with_context(|| format!("Error al guardar Excel en {:?}", ruta_salida))?;
    Ok(())
}

fn detalle_workbook(reporte: &Reporte) -> std::result::Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();

    let encabezado = Format::new().set_bold();
    let fecha = Format::new().set_num_format("dd/mm/yyyy");
    let decimal = Format::new().set_num_format("0.0");

    for tabla in &reporte.detalles {
        let worksheet = workbook.add_worksheet();
        escribir_tabla(worksheet, tabla, &encabezado, &fecha, &decimal)?;
    }

    Ok(workbook)
}

fn escribir_tabla(
    worksheet: &mut Worksheet,
    tabla: &TablaDetalle,
    encabezado: &Format,
    fecha: &Format,
    decimal: &Format,
) -> std::result::Result<(), XlsxError> {
    worksheet.set_name(&tabla.hoja)?;

    for (col, titulo) in tabla.encabezados.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, titulo, encabezado)?;
        worksheet.set_column_width(col as u16, 16)?;
    }

    for (fila, valores) in tabla.filas.iter().enumerate() {
        let row = (fila + 1) as u32;
        for (col, valor) in valores.iter().enumerate() {
            let col = col as u16;
            match valor {
                Valor::Texto(texto) => {
                    worksheet.write_string(row, col, texto)?;
                }
                Valor::Decimal(numero) => {
                    worksheet.write_number_with_format(row, col, *numero, decimal)?;
                }
                Valor::Fecha(dia) => {
                    let celda =
                        ExcelDateTime::from_ymd(dia.year() as u16, dia.month() as u8, dia.day() as u8)?;
                    worksheet.write_datetime_with_format(row, col, &celda, fecha)?;
                }
                Valor::Vacio => {}
            }
        }
    }

    if !tabla.filas.is_empty() {
        worksheet.set_freeze_panes(1, 0)?;
        worksheet.autofilter(
            0,
            0,
            tabla.filas.len() as u32,
            (tabla.encabezados.len().max(1) - 1) as u16,
        )?;
    }

    Ok(())
}
