//! Generación de un reporte completo a partir del Excel cargado.
//!
//! Normaliza la consulta base, detecta movimientos (comparando nóminas en el
//! reporte diario o recorriendo fechas en los periódicos) y arma las tablas
//! que consumen el PDF y la exportación a Excel.

use crate::agregador::{con_promedios, frecuencias, tabla_cruzada, TablaCruzada, TablaFrecuencias};
use crate::config::Config;
use crate::diferencias::{comparar, CambioOrganizativo, OrigenCambio};
use crate::error::{Advertencia, ErrorReporte, Resultado};
use crate::excel_handler::Libro;
use crate::metricas::{activos_a_fecha, antiguedad, edad, formatear_fecha};
use crate::modelo::{Alta, Baja, EmpleadoRegistro, Nomina};
use crate::normalizador::{hoja_opcional, hoja_requerida, Campo};
use crate::periodo::{filtrar_por_periodo, normalizar_categoria_anual, validar_rango, TipoReporte};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Archivo Excel ya leído.
#[derive(Debug, Clone)]
pub struct ArchivoCargado {
    pub nombre: String,
    pub libro: Libro,
}

/// Excel cargado en la sesión actual.
///
/// Se crea al cargar un archivo y se reemplaza al cargar otro, así cambiar de
/// tipo de reporte no vuelve a leer el Excel.
#[derive(Debug, Default)]
pub struct Sesion {
    archivo: Option<ArchivoCargado>,
}

impl Sesion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cargar(&mut self, ruta: &Path) -> Resultado<()> {
        let libro = Libro::abrir(ruta)?;
        let nombre = ruta
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("archivo.xlsx")
            .to_string();
        info!("Archivo cargado: {} ({} hojas)", nombre, libro.hojas.len());
        self.archivo = Some(ArchivoCargado { nombre, libro });
        Ok(())
    }

    pub fn cargar_bytes(&mut self, nombre: &str, bytes: &[u8]) -> Resultado<()> {
        let libro = Libro::desde_bytes(bytes)?;
        self.archivo = Some(ArchivoCargado {
            nombre: nombre.to_string(),
            libro,
        });
        Ok(())
    }

    pub fn descartar(&mut self) {
        self.archivo = None;
    }

    pub fn archivo(&self) -> Option<&ArchivoCargado> {
        self.archivo.as_ref()
    }
}

/// Pedido de reporte: tipo y rango de fechas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolicitudReporte {
    pub tipo: TipoReporte,
    pub inicio: NaiveDate,
    pub fin: NaiveDate,
}

impl SolicitudReporte {
    /// Completa las fechas faltantes con el rango por defecto del tipo.
    pub fn nueva(
        tipo: TipoReporte,
        inicio: Option<NaiveDate>,
        fin: Option<NaiveDate>,
        hoy: NaiveDate,
    ) -> Resultado<Self> {
        let (inicio_defecto, fin_defecto) = tipo.rango_por_defecto(hoy);
        let solicitud = SolicitudReporte {
            tipo,
            inicio: inicio.unwrap_or(inicio_defecto),
            fin: fin.unwrap_or(fin_defecto),
        };
        validar_rango(solicitud.inicio, solicitud.fin)?;
        Ok(solicitud)
    }
}

/// Valor de una celda de detalle.
#[derive(Debug, Clone, PartialEq)]
pub enum Valor {
    Texto(String),
    Fecha(NaiveDate),
    Decimal(f64),
    Vacio,
}

impl Valor {
    fn fecha(fecha: Option<NaiveDate>) -> Self {
        fecha.map(Valor::Fecha).unwrap_or(Valor::Vacio)
    }
}

impl fmt::Display for Valor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Valor::Texto(texto) => f.write_str(texto),
            Valor::Fecha(fecha) => f.write_str(&formatear_fecha(Some(*fecha))),
            Valor::Decimal(numero) => write!(f, "{:.1}", numero),
            Valor::Vacio => Ok(()),
        }
    }
}

/// Tabla de detalle por empleado.
#[derive(Debug, Clone, PartialEq)]
pub struct TablaDetalle {
    pub titulo: String,
    /// Nombre de la hoja al exportar a Excel.
    pub hoja: String,
    pub encabezados: Vec<String>,
    pub filas: Vec<Vec<Valor>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kpis {
    pub activos: usize,
    pub altas: usize,
    pub bajas: usize,
    /// Sólo en el modo de comparación.
    pub cambios_organizativos: Option<usize>,
}

/// Resultado completo de un reporte, listo para renderizar.
#[derive(Debug, Clone)]
pub struct Reporte {
    pub solicitud: SolicitudReporte,
    pub archivo: String,
    pub fecha_referencia: NaiveDate,
    pub generado: NaiveDateTime,
    pub kpis: Kpis,
    pub activos: TablaCruzada,
    pub altas: TablaCruzada,
    pub bajas: TablaCruzada,
    pub motivos_baja: TablaFrecuencias,
    pub detalles: Vec<TablaDetalle>,
    pub advertencias: Vec<Advertencia>,
}

impl Reporte {
    pub fn titulo(&self) -> &'static str {
        self.solicitud.tipo.titulo()
    }

    /// Nombre de archivo sugerido para el PDF.
    pub fn nombre_archivo(&self, extension: &str) -> String {
        format!(
            "Reporte_{}_{}_{}.{}",
            self.solicitud.tipo,
            self.solicitud.inicio.format("%Y%m%d"),
            self.solicitud.fin.format("%Y%m%d"),
            extension
        )
    }
}

// Movimientos detectados, cualquiera sea el modo.
struct Movimientos {
    activos: Vec<EmpleadoRegistro>,
    altas: Vec<Alta>,
    bajas: Vec<Baja>,
    cambios: Option<Vec<CambioOrganizativo>>,
}

/// Genera el reporte pedido sobre el archivo de la sesión.
pub fn generar(sesion: &Sesion, solicitud: &SolicitudReporte, config: &Config) -> Resultado<Reporte> {
    validar_rango(solicitud.inicio, solicitud.fin)?;
    let archivo = sesion.archivo().ok_or(ErrorReporte::SinArchivo)?;
    generar_desde_libro(&archivo.libro, &archivo.nombre, solicitud, config)
}

pub fn generar_desde_libro(
    libro: &Libro,
    archivo: &str,
    solicitud: &SolicitudReporte,
    config: &Config,
) -> Resultado<Reporte> {
    validar_rango(solicitud.inicio, solicitud.fin)?;
    info!(
        "Generando reporte {} del {} al {}",
        solicitud.tipo, solicitud.inicio, solicitud.fin
    );

    let base = hoja_requerida(libro, &config.hoja_base, &Campo::TODOS)?;
    let mut advertencias = base.advertencias;
    let base = base.nomina;
    let fecha_referencia = solicitud.fin;

    let movimientos = if solicitud.tipo.usa_comparacion() {
        modo_comparacion(libro, &base, config, &mut advertencias)?
    } else {
        modo_periodo(&base, solicitud, config, &mut advertencias)?
    };

    let al = Some(fecha_referencia);
    let activos = con_promedios(
        tabla_cruzada(
            "Dotación activa",
            "Categoría",
            &movimientos.activos,
            |r| r.categoria.clone(),
            |r| r.linea.clone(),
        ),
        &movimientos.activos,
        |r| r.categoria.clone(),
        |r| antiguedad(r, al),
        |r| edad(r, al),
    );

    let altas = con_promedios(
        tabla_cruzada(
            "Altas",
            "Categoría",
            &movimientos.altas,
            |a| a.registro.categoria.clone(),
            |a| a.registro.linea.clone(),
        ),
        &movimientos.altas,
        |a| a.registro.categoria.clone(),
        |a| antiguedad(&a.registro, al),
        |a| edad(&a.registro, al),
    );

    // Las bajas se miden a la fecha de egreso, no a la del reporte
    let bajas = con_promedios(
        tabla_cruzada(
            "Bajas",
            "Categoría",
            &movimientos.bajas,
            |b| b.registro.categoria.clone(),
            |b| b.registro.linea.clone(),
        ),
        &movimientos.bajas,
        |b| b.registro.categoria.clone(),
        |b| antiguedad(&b.registro, b.fecha_egreso),
        |b| edad(&b.registro, b.fecha_egreso),
    );

    let motivos_baja = frecuencias(
        "Bajas por motivo",
        "Motivo",
        &movimientos.bajas,
        |b| {
            b.registro
                .motivo_baja
                .clone()
                .unwrap_or_else(|| "Sin motivo".to_string())
        },
    );

    let mut detalles = vec![
        detalle_altas(&movimientos.altas, al),
        detalle_bajas(&movimientos.bajas),
    ];
    if let Some(cambios) = &movimientos.cambios {
        detalles.push(detalle_cambios(cambios));
    }

    let kpis = Kpis {
        activos: movimientos.activos.len(),
        altas: movimientos.altas.len(),
        bajas: movimientos.bajas.len(),
        cambios_organizativos: movimientos.cambios.as_ref().map(|c| c.len()),
    };

    for advertencia in &advertencias {
        warn!("{}", advertencia);
    }
    info!(
        "Reporte listo: {} activos, {} altas, {} bajas",
        kpis.activos, kpis.altas, kpis.bajas
    );

    Ok(Reporte {
        solicitud: *solicitud,
        archivo: archivo.to_string(),
        fecha_referencia,
        generado: chrono::Local::now().naive_local(),
        kpis,
        activos,
        altas,
        bajas,
        motivos_baja,
        detalles,
        advertencias,
    })
}

fn modo_comparacion(
    libro: &Libro,
    base: &Nomina,
    config: &Config,
    advertencias: &mut Vec<Advertencia>,
) -> Resultado<Movimientos> {
    let anterior = match hoja_opcional(libro, &config.hoja_activos, &[Campo::Legajo])? {
        Some(hoja) => {
            advertencias.extend(hoja.advertencias);
            hoja.nomina
        }
        // La comparación avisa con SinNominaAnterior al ver la nómina vacía
        None => {
            warn!("No se encontró la hoja '{}'", config.hoja_activos);
            Nomina {
                hoja: config.hoja_activos.clone(),
                registros: Vec::new(),
            }
        }
    };

    let cambios = hoja_opcional(libro, &config.hoja_cambios, &[Campo::Legajo])?;
    if let Some(hoja) = &cambios {
        advertencias.extend(hoja.advertencias.iter().cloned());
    }

    let diferencias = comparar(&anterior, base, cambios.as_ref().map(|h| &h.nomina));
    advertencias.extend(diferencias.advertencias);

    let sin_hoja = cambios.as_ref().map_or(true, |h| h.nomina.is_empty());
    if sin_hoja && !diferencias.cambios_organizativos.is_empty() {
        advertencias.push(Advertencia::SinHojaCambios {
            hoja: config.hoja_cambios.clone(),
            cantidad: diferencias.cambios_organizativos.len(),
        });
    }

    let activos = base
        .registros
        .iter()
        .filter(|r| r.estado.es_activo())
        .cloned()
        .collect();

    Ok(Movimientos {
        activos,
        altas: diferencias.altas,
        bajas: diferencias.bajas,
        cambios: Some(diferencias.cambios_organizativos),
    })
}

fn modo_periodo(
    base: &Nomina,
    solicitud: &SolicitudReporte,
    config: &Config,
    advertencias: &mut Vec<Advertencia>,
) -> Resultado<Movimientos> {
    let mut periodo = filtrar_por_periodo(&base.registros, solicitud.inicio, solicitud.fin)?;

    if solicitud.tipo == TipoReporte::Anual {
        if let Some(aviso) = normalizar_categoria_anual(
            &mut periodo.altas,
            &config.categoria_ingreso_anual,
            config.conservar_categoria_original,
        ) {
            advertencias.push(aviso);
        }
    }

    let activos = activos_a_fecha(&base.registros, solicitud.fin)
        .into_iter()
        .cloned()
        .collect();

    Ok(Movimientos {
        activos,
        altas: periodo.altas,
        bajas: periodo.bajas,
        cambios: None,
    })
}

fn texto(valor: impl ToString) -> Valor {
    Valor::Texto(valor.to_string())
}

fn detalle_altas(altas: &[Alta], al: Option<NaiveDate>) -> TablaDetalle {
    let con_original = altas.iter().any(|a| a.categoria_original.is_some());

    let mut encabezados = vec!["Legajo", "Apellido y Nombre", "Línea", "Categoría"];
    if con_original {
        encabezados.push("Categoría original");
    }
    encabezados.extend(["Fecha de Ingreso", "Antigüedad", "Edad"]);

    let mut ordenadas: Vec<&Alta> = altas.iter().collect();
    ordenadas.sort_by(|a, b| {
        a.registro
            .fecha_ingreso
            .cmp(&b.registro.fecha_ingreso)
            .then_with(|| a.registro.apellido_nombre.cmp(&b.registro.apellido_nombre))
    });

    let filas = ordenadas
        .into_iter()
        .map(|alta| {
            let r = &alta.registro;
            let mut fila = vec![
                texto(&r.legajo),
                texto(&r.apellido_nombre),
                texto(&r.linea),
                texto(&r.categoria),
            ];
            if con_original {
                fila.push(
                    alta.categoria_original
                        .as_ref()
                        .map(texto)
                        .unwrap_or(Valor::Vacio),
                );
            }
            fila.push(Valor::fecha(r.fecha_ingreso));
            fila.push(Valor::Decimal(antiguedad(r, al)));
            fila.push(Valor::Decimal(edad(r, al)));
            fila
        })
        .collect();

    TablaDetalle {
        titulo: "Detalle de altas".to_string(),
        hoja: "Altas".to_string(),
        encabezados: encabezados.into_iter().map(String::from).collect(),
        filas,
    }
}

fn detalle_bajas(bajas: &[Baja]) -> TablaDetalle {
    let mut ordenadas: Vec<&Baja> = bajas.iter().collect();
    ordenadas.sort_by(|a, b| {
        a.fecha_egreso
            .cmp(&b.fecha_egreso)
            .then_with(|| a.registro.apellido_nombre.cmp(&b.registro.apellido_nombre))
    });

    let filas = ordenadas
        .into_iter()
        .map(|baja| {
            let r = &baja.registro;
            vec![
                texto(&r.legajo),
                texto(&r.apellido_nombre),
                texto(&r.linea),
                texto(&r.categoria),
                Valor::fecha(baja.fecha_egreso),
                r.motivo_baja.as_ref().map(texto).unwrap_or(Valor::Vacio),
                Valor::Decimal(antiguedad(r, baja.fecha_egreso)),
                Valor::Decimal(edad(r, baja.fecha_egreso)),
            ]
        })
        .collect();

    TablaDetalle {
        titulo: "Detalle de bajas".to_string(),
        hoja: "Bajas".to_string(),
        encabezados: [
            "Legajo",
            "Apellido y Nombre",
            "Línea",
            "Categoría",
            "Fecha de Egreso",
            "Motivo",
            "Antigüedad",
            "Edad",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
        filas,
    }
}

fn detalle_cambios(cambios: &[CambioOrganizativo]) -> TablaDetalle {
    let filas = cambios
        .iter()
        .map(|cambio| {
            let r = &cambio.registro;
            let origen = match cambio.origen {
                OrigenCambio::HojaCambios => "Hoja CO",
                OrigenCambio::NominaAnterior => "Nómina anterior",
            };
            vec![
                texto(&r.legajo),
                texto(&r.apellido_nombre),
                texto(&r.linea),
                texto(&r.categoria),
                texto(origen),
            ]
        })
        .collect();

    TablaDetalle {
        titulo: "Cambios organizativos".to_string(),
        hoja: "Cambios Organizativos".to_string(),
        encabezados: ["Legajo", "Apellido y Nombre", "Línea", "Categoría", "Origen"]
            .into_iter()
            .map(String::from)
            .collect(),
        filas,
    }
}
