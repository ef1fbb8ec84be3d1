//! Normalización de hojas de nómina.
//!
//! Renombra los encabezados a los nombres canónicos, convierte fechas y
//! valores categóricos, y resuelve legajos duplicados (gana la última fila).

use crate::error::{Advertencia, ErrorReporte, Resultado};
use crate::excel_handler::{Libro, TablaCruda};
use crate::modelo::{Categoria, EmpleadoRegistro, EstadoOcupacion, Legajo, Linea, Nomina};
use calamine::{Data, DataType};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Columnas canónicas de una nómina.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Campo {
    Legajo,
    ApellidoNombre,
    EstadoOcupacion,
    FechaIngreso,
    Desde,
    FechaNacimiento,
    Linea,
    Categoria,
    MotivoBaja,
}

impl Campo {
    pub const TODOS: [Campo; 9] = [
        Campo::Legajo,
        Campo::ApellidoNombre,
        Campo::EstadoOcupacion,
        Campo::FechaIngreso,
        Campo::Desde,
        Campo::FechaNacimiento,
        Campo::Linea,
        Campo::Categoria,
        Campo::MotivoBaja,
    ];

    pub fn nombre(&self) -> &'static str {
        match self {
            Campo::Legajo => "Legajo",
            Campo::ApellidoNombre => "Apellido y Nombre",
            Campo::EstadoOcupacion => "Estado de Ocupación",
            Campo::FechaIngreso => "Fecha de Ingreso",
            Campo::Desde => "Desde",
            Campo::FechaNacimiento => "Fecha de Nacimiento",
            Campo::Linea => "Línea",
            Campo::Categoria => "Categoría",
            Campo::MotivoBaja => "Motivo de Baja",
        }
    }

    /// Alias aceptados, ya normalizados con [`normalizar_texto`].
    fn alias(&self) -> &'static [&'static str] {
        match self {
            Campo::Legajo => &["legajo", "nro legajo", "nro. legajo", "id empleado", "employee id"],
            Campo::ApellidoNombre => &[
                "apellido y nombre",
                "apellido, nombre",
                "nombre",
                "nombre completo",
            ],
            Campo::EstadoOcupacion => &["estado de ocupacion", "ocupacion", "estado"],
            Campo::FechaIngreso => &[
                "fecha de ingreso",
                "fecha ingreso",
                "fecha",
                "ingreso",
                "fecha alta",
            ],
            Campo::Desde => &["desde", "fecha baja", "fecha de baja"],
            Campo::FechaNacimiento => &["fecha de nacimiento", "fecha nacimiento", "nacimiento"],
            Campo::Linea => &["linea", "linea organizativa"],
            Campo::Categoria => &["categoria", "categoria laboral"],
            Campo::MotivoBaja => &["motivo de baja", "motivo baja", "motivo"],
        }
    }
}

fn espacios() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("regex de espacios"))
}

fn anio_corto() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{2})$").expect("regex de fecha corta")
    })
}

/// Minúsculas, sin acentos y con los espacios colapsados.
pub fn normalizar_texto(texto: &str) -> String {
    let sin_acentos: String = texto
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            otro => otro,
        })
        .collect();
    espacios().replace_all(&sin_acentos, " ").into_owned()
}

/// Ubica cada campo pedido en la tabla. Devuelve error con las columnas
/// esperadas y encontradas si falta alguno.
fn mapear_columnas(tabla: &TablaCruda, requeridos: &[Campo]) -> Resultado<HashMap<Campo, usize>> {
    let normalizados: Vec<String> = tabla
        .encabezados
        .iter()
        .map(|e| normalizar_texto(e))
        .collect();

    let mut indices = HashMap::new();
    for campo in Campo::TODOS {
        // El nombre canónico tiene prioridad sobre los alias más genéricos
        let posicion = campo
            .alias()
            .iter()
            .find_map(|alias| normalizados.iter().position(|h| h == alias));
        if let Some(idx) = posicion {
            indices.insert(campo, idx);
        }
    }

    let faltantes: Vec<&Campo> = requeridos
        .iter()
        .filter(|c| !indices.contains_key(*c))
        .collect();

    if !faltantes.is_empty() {
        return Err(ErrorReporte::ColumnasFaltantes {
            hoja: tabla.nombre.clone(),
            esperadas: requeridos.iter().map(|c| c.nombre().to_string()).collect(),
            encontradas: tabla
                .encabezados
                .iter()
                .map(|e| e.trim().to_string())
                .collect(),
        });
    }

    Ok(indices)
}

/// Resultado de normalizar una hoja.
#[derive(Debug, Clone, Default)]
pub struct HojaNormalizada {
    pub nomina: Nomina,
    pub advertencias: Vec<Advertencia>,
}

/// Normaliza una tabla exigiendo los campos indicados.
pub fn normalizar(tabla: &TablaCruda, requeridos: &[Campo]) -> Resultado<HojaNormalizada> {
    let indices = mapear_columnas(tabla, requeridos)?;

    let celda = |fila: &[Data], campo: Campo| -> Option<Data> {
        indices.get(&campo).and_then(|&i| fila.get(i)).cloned()
    };

    let mut registros: Vec<EmpleadoRegistro> = Vec::with_capacity(tabla.filas.len());
    let mut posiciones: HashMap<Legajo, usize> = HashMap::new();
    let mut duplicados: Vec<Legajo> = Vec::new();

    for fila in &tabla.filas {
        let legajo = match celda(fila, Campo::Legajo).and_then(|c| legajo_de_celda(&c)) {
            Some(l) => l,
            None => continue,
        };

        let texto = |campo: Campo| celda(fila, campo).map(|c| texto_de_celda(&c)).unwrap_or_default();
        let fecha = |campo: Campo| celda(fila, campo).and_then(|c| fecha_de_celda(&c));

        let estado_txt = texto(Campo::EstadoOcupacion);
        let linea_txt = texto(Campo::Linea);
        let categoria_txt = texto(Campo::Categoria);
        let motivo = texto(Campo::MotivoBaja);

        let mut registro = EmpleadoRegistro::new(legajo.clone());
        registro.apellido_nombre = texto(Campo::ApellidoNombre);
        if indices.contains_key(&Campo::EstadoOcupacion) {
            registro.estado = EstadoOcupacion::desde_texto(&normalizar_texto(&estado_txt), &estado_txt);
        }
        registro.fecha_ingreso = fecha(Campo::FechaIngreso);
        registro.desde = fecha(Campo::Desde);
        registro.fecha_nacimiento = fecha(Campo::FechaNacimiento);
        registro.linea = Linea::desde_texto(&normalizar_texto(&linea_txt), &linea_txt);
        registro.categoria = Categoria::desde_texto(&normalizar_texto(&categoria_txt), &categoria_txt);
        registro.motivo_baja = if motivo.is_empty() { None } else { Some(motivo) };

        match posiciones.get(&legajo) {
            Some(&i) => {
                if !duplicados.contains(&legajo) {
                    duplicados.push(legajo);
                }
                registros[i] = registro;
            }
            None => {
                posiciones.insert(legajo, registros.len());
                registros.push(registro);
            }
        }
    }

    let mut advertencias = Vec::new();
    if !duplicados.is_empty() {
        warn!(
            "Hoja '{}': {} legajos duplicados",
            tabla.nombre,
            duplicados.len()
        );
        advertencias.push(Advertencia::LegajosDuplicados {
            hoja: tabla.nombre.clone(),
            legajos: duplicados,
        });
    }

    debug!("Hoja '{}' normalizada: {} registros", tabla.nombre, registros.len());

    Ok(HojaNormalizada {
        nomina: Nomina {
            hoja: tabla.nombre.clone(),
            registros,
        },
        advertencias,
    })
}

/// Hoja obligatoria: si no existe es un error.
pub fn hoja_requerida(libro: &Libro, nombre: &str, requeridos: &[Campo]) -> Resultado<HojaNormalizada> {
    let tabla = libro
        .hoja(nombre)
        .ok_or_else(|| ErrorReporte::HojaNoEncontrada {
            hoja: nombre.to_string(),
            disponibles: libro.nombres(),
        })?;
    normalizar(tabla, requeridos)
}

/// Hoja opcional: `Ok(None)` si no existe, error si existe pero está mal formada.
pub fn hoja_opcional(
    libro: &Libro,
    nombre: &str,
    requeridos: &[Campo],
) -> Resultado<Option<HojaNormalizada>> {
    match libro.hoja(nombre) {
        Some(tabla) => normalizar(tabla, requeridos).map(Some),
        None => Ok(None),
    }
}

fn texto_de_celda(celda: &Data) -> String {
    match celda {
        Data::Empty => String::new(),
        otra => otra.to_string().trim().to_string(),
    }
}

fn legajo_de_celda(celda: &Data) -> Option<Legajo> {
    let texto = match celda {
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Int(i) => i.to_string(),
        otra => texto_de_celda(otra),
    };
    if texto.is_empty() {
        None
    } else {
        Some(Legajo::new(texto))
    }
}

/// Convierte una celda a fecha. Los valores que no se pueden interpretar
/// quedan en `None`.
pub fn fecha_de_celda(celda: &Data) -> Option<NaiveDate> {
    match celda {
        Data::DateTime(_) | Data::Float(_) | Data::Int(_) => fecha_serial(celda),
        Data::DateTimeIso(s) | Data::String(s) => fecha_de_texto(s, Local::now().date_naive()),
        _ => None,
    }
}

/// Número de serie de Excel a fecha. calamine resuelve el 29/02/1900
/// ficticio y el sistema 1904.
fn fecha_serial(celda: &Data) -> Option<NaiveDate> {
    let serial = match celda {
        Data::DateTime(dt) => dt.as_f64(),
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        _ => return None,
    };
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    celda.as_date()
}

/// Año de dos cifras: el siglo más reciente que no deja la fecha después
/// de `hoy`.
fn fecha_con_pivote(dia: u32, mes: u32, anio: i32, hoy: NaiveDate) -> Option<NaiveDate> {
    let siglo = hoy.year() - hoy.year().rem_euclid(100);
    match NaiveDate::from_ymd_opt(siglo + anio, mes, dia) {
        Some(fecha) if fecha <= hoy => Some(fecha),
        _ => NaiveDate::from_ymd_opt(siglo - 100 + anio, mes, dia),
    }
}

fn fecha_de_texto(texto: &str, hoy: NaiveDate) -> Option<NaiveDate> {
    let texto = texto.trim();
    if texto.is_empty() {
        return None;
    }

    // %Y acepta años de dos cifras, así que esos van aparte
    if let Some(partes) = anio_corto().captures(texto) {
        let dia = partes[1].parse().ok()?;
        let mes = partes[2].parse().ok()?;
        let anio = partes[3].parse().ok()?;
        return fecha_con_pivote(dia, mes, anio, hoy);
    }

    for formato in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(fecha) = NaiveDate::parse_from_str(texto, formato) {
            return Some(fecha);
        }
    }
    for formato in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(fecha) = NaiveDateTime::parse_from_str(texto, formato) {
            return Some(fecha.date());
        }
    }
    None
}
