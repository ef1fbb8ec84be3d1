// Ocultar ventana de consola en Windows (solo en modo release)
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use reporte_dotacion::config::Config;
use reporte_dotacion::periodo::{parsear_fecha, TipoReporte};
use reporte_dotacion::reporte::{self, Sesion, SolicitudReporte};
use reporte_dotacion::{excel_handler, gui, pdf_reporte};
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "reporte-dotacion")]
#[command(about = "Reportes de dotación en PDF a partir del Excel de personal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    comando: Option<Comando>,
}

#[derive(Subcommand)]
enum Comando {
    /// Genera un reporte sin abrir la ventana
    Generar {
        /// Excel con las hojas de personal
        #[arg(short, long)]
        excel: PathBuf,

        /// diario, semanal, mensual o anual
        #[arg(short, long, default_value = "diario")]
        tipo: TipoReporte,

        /// Inicio del período (DD/MM/AAAA o AAAA-MM-DD)
        #[arg(long, value_parser = fecha_arg)]
        desde: Option<NaiveDate>,

        /// Fin del período (DD/MM/AAAA o AAAA-MM-DD)
        #[arg(long, value_parser = fecha_arg)]
        hasta: Option<NaiveDate>,

        /// Archivo PDF de salida
        #[arg(short, long)]
        salida: Option<PathBuf>,

        /// Exporta también el detalle al Excel indicado
        #[arg(long)]
        detalle: Option<PathBuf>,
    },
}

fn fecha_arg(texto: &str) -> Result<NaiveDate, String> {
    parsear_fecha(texto).ok_or_else(|| format!("Fecha inválida: '{}'", texto))
}

fn cargar_env() {
    // 1. Junto al ejecutable
    if let Ok(exe_path) = env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let env_path = exe_dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
            }
        }
    }

    // 2. Directorio actual de trabajo
    let _ = dotenvy::dotenv();

    // 3. Directorio del proyecto (solo durante desarrollo)
    #[cfg(debug_assertions)]
    {
        let manifest_dir = env!("CARGO_MANIFEST_DIR");
        let env_path = std::path::Path::new(manifest_dir).join(".env");
        let _ = dotenvy::from_path(&env_path);
    }
}

fn main() -> Result<()> {
    cargar_env();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.comando {
        None => gui::run(Config::from_env()).map_err(|e| anyhow!("Error en la interfaz: {}", e)),
        Some(Comando::Generar {
            excel,
            tipo,
            desde,
            hasta,
            salida,
            detalle,
        }) => generar(excel, tipo, desde, hasta, salida, detalle),
    }
}

fn generar(
    excel: PathBuf,
    tipo: TipoReporte,
    desde: Option<NaiveDate>,
    hasta: Option<NaiveDate>,
    salida: Option<PathBuf>,
    detalle: Option<PathBuf>,
) -> Result<()> {
    let config = Config::from_env().context("Error al cargar configuración")?;

    let mut sesion = Sesion::new();
    sesion
        .cargar(&excel)
        .with_context(|| format!("No se pudo leer {}", excel.display()))?;

    let solicitud = SolicitudReporte::nueva(tipo, desde, hasta, Local::now().date_naive())?;
    let reporte = reporte::generar(&sesion, &solicitud, &config)?;

    for advertencia in &reporte.advertencias {
        warn!("{}", advertencia);
    }

    let ruta_pdf = salida.unwrap_or_else(|| config.ruta_salida.join(reporte.nombre_archivo("pdf")));
    let bytes = pdf_reporte::renderizar(&reporte)?;
    fs::write(&ruta_pdf, bytes)
        .with_context(|| format!("No se pudo escribir {}", ruta_pdf.display()))?;
    info!("PDF generado: {}", ruta_pdf.display());
    println!("{}", ruta_pdf.display());

    if let Some(ruta_xlsx) = detalle {
        excel_handler::guardar_detalle(&reporte, &ruta_xlsx)?;
        println!("{}", ruta_xlsx.display());
    }

    Ok(())
}
