//! Tipos del dominio: legajos, líneas, categorías y registros de nómina.

use chrono::{Duration, NaiveDate};
use std::fmt;

/// Identificador de empleado dentro de una nómina.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Legajo(pub String);

impl Legajo {
    pub fn new(valor: impl Into<String>) -> Self {
        Legajo(valor.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Legajo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Estado de ocupación tal como figura en la consulta base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EstadoOcupacion {
    Activo,
    Baja,
    Otro(String),
}

impl EstadoOcupacion {
    /// Interpreta el texto de la celda. Recibe el valor ya normalizado
    /// (minúsculas, sin acentos).
    pub fn desde_texto(normalizado: &str, original: &str) -> Self {
        match normalizado {
            "activo" | "activa" | "active" | "alta" => EstadoOcupacion::Activo,
            "baja" | "dado de baja" | "dada de baja" | "terminated" | "inactivo" | "egreso" => {
                EstadoOcupacion::Baja
            }
            _ => EstadoOcupacion::Otro(original.trim().to_string()),
        }
    }

    pub fn es_activo(&self) -> bool {
        matches!(self, EstadoOcupacion::Activo)
    }

    pub fn es_baja(&self) -> bool {
        matches!(self, EstadoOcupacion::Baja)
    }
}

impl fmt::Display for EstadoOcupacion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstadoOcupacion::Activo => f.write_str("Activo"),
            EstadoOcupacion::Baja => f.write_str("Baja"),
            EstadoOcupacion::Otro(texto) => f.write_str(texto),
        }
    }
}

/// Línea organizativa. El orden de las variantes es el orden de los reportes;
/// los valores fuera del vocabulario van al final.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Linea {
    A,
    B,
    C,
    D,
    E,
    H,
    Premetro,
    Otra(String),
}

impl Linea {
    pub const CONOCIDAS: [Linea; 7] = [
        Linea::A,
        Linea::B,
        Linea::C,
        Linea::D,
        Linea::E,
        Linea::H,
        Linea::Premetro,
    ];

    /// Recibe el valor normalizado (minúsculas, sin acentos) y el original.
    pub fn desde_texto(normalizado: &str, original: &str) -> Self {
        let clave = normalizado.strip_prefix("linea ").unwrap_or(normalizado).trim();
        match clave {
            "a" => Linea::A,
            "b" => Linea::B,
            "c" => Linea::C,
            "d" => Linea::D,
            "e" => Linea::E,
            "h" => Linea::H,
            "premetro" | "pm" => Linea::Premetro,
            "" => Linea::Otra(SIN_DATO.to_string()),
            _ => Linea::Otra(original.trim().to_string()),
        }
    }
}

impl fmt::Display for Linea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Linea::A => f.write_str("Línea A"),
            Linea::B => f.write_str("Línea B"),
            Linea::C => f.write_str("Línea C"),
            Linea::D => f.write_str("Línea D"),
            Linea::E => f.write_str("Línea E"),
            Linea::H => f.write_str("Línea H"),
            Linea::Premetro => f.write_str("Premetro"),
            Linea::Otra(texto) => f.write_str(texto),
        }
    }
}

/// Categoría laboral, con el mismo criterio de orden que [`Linea`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Categoria {
    Ingresante,
    Operario,
    Administrativo,
    Tecnico,
    Supervisor,
    Jefe,
    Gerente,
    Director,
    Otra(String),
}

impl Categoria {
    pub const CONOCIDAS: [Categoria; 8] = [
        Categoria::Ingresante,
        Categoria::Operario,
        Categoria::Administrativo,
        Categoria::Tecnico,
        Categoria::Supervisor,
        Categoria::Jefe,
        Categoria::Gerente,
        Categoria::Director,
    ];

    pub fn desde_texto(normalizado: &str, original: &str) -> Self {
        match normalizado.trim() {
            "ingresante" => Categoria::Ingresante,
            "operario" => Categoria::Operario,
            "administrativo" => Categoria::Administrativo,
            "tecnico" => Categoria::Tecnico,
            "supervisor" => Categoria::Supervisor,
            "jefe" => Categoria::Jefe,
            "gerente" => Categoria::Gerente,
            "director" => Categoria::Director,
            "" => Categoria::Otra(SIN_DATO.to_string()),
            _ => Categoria::Otra(original.trim().to_string()),
        }
    }
}

impl fmt::Display for Categoria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Categoria::Ingresante => f.write_str("Ingresante"),
            Categoria::Operario => f.write_str("Operario"),
            Categoria::Administrativo => f.write_str("Administrativo"),
            Categoria::Tecnico => f.write_str("Técnico"),
            Categoria::Supervisor => f.write_str("Supervisor"),
            Categoria::Jefe => f.write_str("Jefe"),
            Categoria::Gerente => f.write_str("Gerente"),
            Categoria::Director => f.write_str("Director"),
            Categoria::Otra(texto) => f.write_str(texto),
        }
    }
}

/// Texto usado para celdas categóricas vacías.
pub const SIN_DATO: &str = "Sin dato";

/// Una fila de una nómina.
///
/// `desde` conserva la fecha tal como viene en el Excel. La fecha real de
/// egreso se obtiene con [`EmpleadoRegistro::fecha_egreso`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmpleadoRegistro {
    pub legajo: Legajo,
    pub apellido_nombre: String,
    pub estado: EstadoOcupacion,
    pub fecha_ingreso: Option<NaiveDate>,
    pub desde: Option<NaiveDate>,
    pub fecha_nacimiento: Option<NaiveDate>,
    pub linea: Linea,
    pub categoria: Categoria,
    pub motivo_baja: Option<String>,
}

impl EmpleadoRegistro {
    /// Registro mínimo, útil para hojas que sólo traen el legajo.
    pub fn new(legajo: Legajo) -> Self {
        EmpleadoRegistro {
            legajo,
            apellido_nombre: String::new(),
            estado: EstadoOcupacion::Activo,
            fecha_ingreso: None,
            desde: None,
            fecha_nacimiento: None,
            linea: Linea::Otra(SIN_DATO.to_string()),
            categoria: Categoria::Otra(SIN_DATO.to_string()),
            motivo_baja: None,
        }
    }

    /// Último día trabajado de una baja.
    ///
    /// La fecha "Desde" se registra como el día siguiente al último día
    /// trabajado, así que se resta un día. Sólo aplica a registros en baja.
    pub fn fecha_egreso(&self) -> Option<NaiveDate> {
        if !self.estado.es_baja() {
            return None;
        }
        self.desde.map(corregir_fecha_baja)
    }
}

/// Días que se restan a la fecha "Desde" de una baja.
pub const DIAS_CORRECCION_BAJA: i64 = 1;

pub fn corregir_fecha_baja(desde: NaiveDate) -> NaiveDate {
    desde - Duration::days(DIAS_CORRECCION_BAJA)
}

/// Un ingreso detectado, con la categoría previa a la normalización anual
/// cuando se conserva.
#[derive(Debug, Clone, PartialEq)]
pub struct Alta {
    pub registro: EmpleadoRegistro,
    pub categoria_original: Option<Categoria>,
}

impl Alta {
    pub fn new(registro: EmpleadoRegistro) -> Self {
        Alta {
            registro,
            categoria_original: None,
        }
    }
}

/// Una baja con la fecha de egreso ya corregida.
///
/// Sólo se construye desde un registro con estado `Baja`; la corrección se
/// calcula a partir de `desde`, que nunca se modifica.
#[derive(Debug, Clone, PartialEq)]
pub struct Baja {
    pub registro: EmpleadoRegistro,
    pub fecha_egreso: Option<NaiveDate>,
}

impl Baja {
    pub fn desde_registro(registro: &EmpleadoRegistro) -> Option<Self> {
        if !registro.estado.es_baja() {
            return None;
        }
        Some(Baja {
            fecha_egreso: registro.fecha_egreso(),
            registro: registro.clone(),
        })
    }
}

/// Conjunto de registros normalizados de una hoja.
#[derive(Debug, Clone, Default)]
pub struct Nomina {
    pub hoja: String,
    pub registros: Vec<EmpleadoRegistro>,
}

impl Nomina {
    pub fn legajos(&self) -> std::collections::HashSet<&Legajo> {
        self.registros.iter().map(|r| &r.legajo).collect()
    }

    pub fn buscar(&self, legajo: &Legajo) -> Option<&EmpleadoRegistro> {
        self.registros.iter().find(|r| &r.legajo == legajo)
    }

    pub fn len(&self) -> usize {
        self.registros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registros.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fecha(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn lineas_conocidas_ordenan_antes_que_desconocidas() {
        let mut lineas = vec![
            Linea::Otra("Talleres".to_string()),
            Linea::Premetro,
            Linea::A,
            Linea::H,
        ];
        lineas.sort();
        assert_eq!(
            lineas,
            vec![
                Linea::A,
                Linea::H,
                Linea::Premetro,
                Linea::Otra("Talleres".to_string())
            ]
        );
    }

    #[test]
    fn linea_acepta_prefijo() {
        assert_eq!(Linea::desde_texto("linea b", "Línea B"), Linea::B);
        assert_eq!(Linea::desde_texto("b", "B"), Linea::B);
        assert_eq!(
            Linea::desde_texto("depósito", "Depósito"),
            Linea::Otra("Depósito".to_string())
        );
    }

    #[test]
    fn fecha_egreso_resta_un_dia_solo_en_bajas() {
        let mut registro = EmpleadoRegistro::new(Legajo::new("2"));
        registro.desde = Some(fecha(2024, 3, 10));
        assert_eq!(registro.fecha_egreso(), None);

        registro.estado = EstadoOcupacion::Baja;
        assert_eq!(registro.fecha_egreso(), Some(fecha(2024, 3, 9)));
        // el campo original no se modifica
        assert_eq!(registro.desde, Some(fecha(2024, 3, 10)));
        assert_eq!(registro.fecha_egreso(), Some(fecha(2024, 3, 9)));
    }

    #[test]
    fn fecha_egreso_cruza_limite_de_mes() {
        assert_eq!(corregir_fecha_baja(fecha(2024, 3, 1)), fecha(2024, 2, 29));
    }
}
