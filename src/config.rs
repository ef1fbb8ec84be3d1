use crate::modelo::Categoria;
use crate::normalizador::normalizar_texto;
use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;

/// Configuración de la aplicación cargada desde variables de entorno
#[derive(Debug, Clone)]
pub struct Config {
    pub hoja_base: String,
    pub hoja_activos: String,
    pub hoja_cambios: String,
    /// Categoría con la que se informan las altas del reporte anual
    pub categoria_ingreso_anual: Categoria,
    pub conservar_categoria_original: bool,
    pub ruta_salida: PathBuf,
    pub ruta_icono: Option<PathBuf>,
}

impl Config {
    /// Carga la configuración desde las variables de entorno
    pub fn from_env() -> Result<Self> {
        Self::desde_fuente(|clave| env::var(clave).ok())
    }

    /// Arma la configuración con una función que resuelve cada variable.
    /// Las variables ausentes o vacías toman el valor por defecto.
    pub fn desde_fuente(leer: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let leer = |clave: &str| leer(clave).filter(|v| !v.trim().is_empty());
        let defecto = Config::default();

        let categoria_ingreso_anual = match leer("CATEGORIA_INGRESO_ANUAL") {
            Some(texto) => Categoria::desde_texto(&normalizar_texto(&texto), &texto),
            None => defecto.categoria_ingreso_anual,
        };

        let conservar_categoria_original = match leer("CONSERVAR_CATEGORIA_ORIGINAL") {
            Some(texto) => parsear_bool(&texto)?,
            None => defecto.conservar_categoria_original,
        };

        Ok(Config {
            hoja_base: leer("HOJA_BASE").unwrap_or(defecto.hoja_base),
            hoja_activos: leer("HOJA_ACTIVOS").unwrap_or(defecto.hoja_activos),
            hoja_cambios: leer("HOJA_CO").unwrap_or(defecto.hoja_cambios),
            categoria_ingreso_anual,
            conservar_categoria_original,
            ruta_salida: leer("RUTA_SALIDA")
                .map(PathBuf::from)
                .unwrap_or(defecto.ruta_salida),
            ruta_icono: leer("RUTA_ICONO").map(PathBuf::from),
        })
    }
}

fn parsear_bool(texto: &str) -> Result<bool> {
    match normalizar_texto(texto).as_str() {
        "1" | "true" | "si" | "s" | "yes" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        _ => bail!(
            "Valor inválido para CONSERVAR_CATEGORIA_ORIGINAL: '{}' (use true o false)",
            texto
        ),
    }
}

impl Default for Config {
    /// Configuración por defecto cuando no hay .env
    fn default() -> Self {
        Config {
            hoja_base: "Consulta Base".to_string(),
            hoja_activos: "Activos".to_string(),
            hoja_cambios: "CO".to_string(),
            categoria_ingreso_anual: Categoria::Ingresante,
            conservar_categoria_original: true,
            ruta_salida: dirs::document_dir().unwrap_or_else(|| PathBuf::from(".")),
            ruta_icono: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fuente(pares: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let mapa: HashMap<String, String> = pares
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |clave: &str| mapa.get(clave).cloned()
    }

    #[test]
    fn sin_variables_usa_valores_por_defecto() {
        let config = Config::desde_fuente(fuente(&[])).unwrap();
        assert_eq!(config.hoja_base, "Consulta Base");
        assert_eq!(config.hoja_activos, "Activos");
        assert_eq!(config.hoja_cambios, "CO");
        assert_eq!(config.categoria_ingreso_anual, Categoria::Ingresante);
        assert!(config.conservar_categoria_original);
        assert!(config.ruta_icono.is_none());
    }

    #[test]
    fn lee_variables_definidas() {
        let config = Config::desde_fuente(fuente(&[
            ("HOJA_BASE", "Base Query"),
            ("HOJA_CO", "Cambios"),
            ("CATEGORIA_INGRESO_ANUAL", "Operario"),
            ("CONSERVAR_CATEGORIA_ORIGINAL", "No"),
            ("RUTA_SALIDA", "/tmp/reportes"),
            ("HOJA_ACTIVOS", "  "),
        ]))
        .unwrap();
        assert_eq!(config.hoja_base, "Base Query");
        assert_eq!(config.hoja_cambios, "Cambios");
        assert_eq!(config.hoja_activos, "Activos");
        assert_eq!(config.categoria_ingreso_anual, Categoria::Operario);
        assert!(!config.conservar_categoria_original);
        assert_eq!(config.ruta_salida, PathBuf::from("/tmp/reportes"));
    }

    #[test]
    fn booleano_invalido_es_error() {
        let r = Config::desde_fuente(fuente(&[("CONSERVAR_CATEGORIA_ORIGINAL", "quizás")]));
        assert!(r.is_err());
    }
}
