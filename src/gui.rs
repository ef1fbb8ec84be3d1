use crate::config::Config;
use crate::excel_handler;
use crate::pdf_reporte;
use crate::periodo::{parsear_fecha, TipoReporte};
use crate::reporte::{self, Reporte, Sesion, SolicitudReporte};
use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use eframe::egui;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const FORMATO_FECHA: &str = "%d/%m/%Y";

/// Estado de la aplicación
#[derive(Debug, Clone, PartialEq)]
pub enum EstadoApp {
    Listo,
    Finalizado(String),
    Error(String),
}

/// Aplicación principal
pub struct ReporteDotacionApp {
    config: Config,
    sesion: Sesion,
    tipo: TipoReporte,
    desde: String,
    hasta: String,
    estado: EstadoApp,
    advertencias: Vec<String>,
}

impl ReporteDotacionApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: Result<Config>) -> Self {
        let (config, estado) = match config {
            Ok(cfg) => (cfg, EstadoApp::Listo),
            Err(e) => {
                error!("Error al cargar configuración: {}", e);
                (
                    Config::default(),
                    EstadoApp::Error(format!("Error de configuración: {}", e)),
                )
            }
        };

        let mut app = Self {
            config,
            sesion: Sesion::new(),
            tipo: TipoReporte::Diario,
            desde: String::new(),
            hasta: String::new(),
            estado,
            advertencias: Vec::new(),
        };
        app.proponer_rango();
        app
    }

    fn proponer_rango(&mut self) {
        let (inicio, fin) = self.tipo.rango_por_defecto(Local::now().date_naive());
        self.desde = inicio.format(FORMATO_FECHA).to_string();
        self.hasta = fin.format(FORMATO_FECHA).to_string();
    }

    fn fecha_campo(texto: &str, campo: &str) -> Result<Option<NaiveDate>> {
        if texto.trim().is_empty() {
            return Ok(None);
        }
        parsear_fecha(texto)
            .map(Some)
            .ok_or_else(|| anyhow!("Fecha '{}' inválida en {} (use DD/MM/AAAA)", texto, campo))
    }

    fn cargar_excel(&mut self) {
        let Some(ruta) = rfd::FileDialog::new()
            .add_filter("Excel", &["xlsx", "xlsm", "xls"])
            .pick_file()
        else {
            return;
        };

        self.advertencias.clear();
        self.estado = match self.sesion.cargar(&ruta) {
            Ok(()) => EstadoApp::Finalizado(format!("Archivo cargado: {}", nombre_de(&ruta))),
            Err(e) => {
                self.sesion.descartar();
                EstadoApp::Error(e.to_string())
            }
        };
    }

    fn armar_reporte(&mut self) -> Result<Reporte> {
        let inicio = Self::fecha_campo(&self.desde, "Desde")?;
        let fin = Self::fecha_campo(&self.hasta, "Hasta")?;
        let solicitud = SolicitudReporte::nueva(self.tipo, inicio, fin, Local::now().date_naive())?;
        let reporte = reporte::generar(&self.sesion, &solicitud, &self.config)?;

        self.advertencias = reporte.advertencias.iter().map(|a| a.to_string()).collect();
        for advertencia in &self.advertencias {
            warn!("{}", advertencia);
        }
        Ok(reporte)
    }

    fn generar_pdf(&mut self) -> Result<Option<PathBuf>> {
        let reporte = self.armar_reporte()?;
        let bytes = pdf_reporte::renderizar(&reporte)?;

        let Some(ruta) = rfd::FileDialog::new()
            .set_directory(&self.config.ruta_salida)
            .set_file_name(reporte.nombre_archivo("pdf"))
            .add_filter("PDF", &["pdf"])
            .save_file()
        else {
            return Ok(None);
        };

        std::fs::write(&ruta, bytes)
            .with_context(|| format!("No se pudo escribir {}", ruta.display()))?;
        info!("PDF guardado en {}", ruta.display());
        Ok(Some(ruta))
    }

    fn exportar_detalle(&mut self) -> Result<Option<PathBuf>> {
        let reporte = self.armar_reporte()?;

        let Some(ruta) = rfd::FileDialog::new()
            .set_directory(&self.config.ruta_salida)
            .set_file_name(reporte.nombre_archivo("xlsx"))
            .add_filter("Excel", &["xlsx"])
            .save_file()
        else {
            return Ok(None);
        };

        excel_handler::guardar_detalle(&reporte, &ruta)?;
        Ok(Some(ruta))
    }

    fn informar(&mut self, resultado: Result<Option<PathBuf>>) {
        self.estado = match resultado {
            Ok(Some(ruta)) => EstadoApp::Finalizado(format!("Guardado: {}", nombre_de(&ruta))),
            Ok(None) => EstadoApp::Listo,
            Err(e) => {
                error!("{:#}", e);
                EstadoApp::Error(format!("{:#}", e))
            }
        };
    }
}

fn nombre_de(ruta: &Path) -> String {
    ruta.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl eframe::App for ReporteDotacionApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let panel_width = ui.available_width();
            let content_width = 380.0_f32.min(panel_width - 40.0);

            ui.vertical_centered(|ui| {
                ui.add_space(25.0);

                ui.label(
                    egui::RichText::new("Reporte de Dotación")
                        .heading()
                        .size(22.0),
                );

                ui.add_space(20.0);

                let tipo_anterior = self.tipo;

                ui.allocate_ui_with_layout(
                    egui::vec2(content_width, 0.0),
                    egui::Layout::top_down(egui::Align::Center),
                    |ui| {
                        egui::Frame::default()
                            .inner_margin(egui::Margin::same(20.0))
                            .fill(ui.style().visuals.extreme_bg_color)
                            .rounding(egui::Rounding::same(10.0))
                            .stroke(egui::Stroke::new(
                                1.0,
                                ui.style().visuals.widgets.noninteractive.bg_stroke.color,
                            ))
                            .show(ui, |ui| {
                                ui.set_width(content_width - 40.0);

                                egui::Grid::new("input_grid")
                                    .num_columns(2)
                                    .spacing([15.0, 12.0])
                                    .show(ui, |ui| {
                                        ui.label("Archivo:");
                                        let nombre = self
                                            .sesion
                                            .archivo()
                                            .map(|a| a.nombre.clone())
                                            .unwrap_or_else(|| "(ninguno)".to_string());
                                        ui.label(egui::RichText::new(nombre).monospace());
                                        ui.end_row();

                                        ui.label("Tipo de reporte:");
                                        egui::ComboBox::from_label("")
                                            .selected_text(self.tipo.to_string())
                                            .show_ui(ui, |ui| {
                                                for tipo in TipoReporte::TODOS {
                                                    ui.selectable_value(
                                                        &mut self.tipo,
                                                        tipo,
                                                        tipo.to_string(),
                                                    );
                                                }
                                            });
                                        ui.end_row();

                                        ui.label("Desde:");
                                        ui.add(
                                            egui::TextEdit::singleline(&mut self.desde)
                                                .desired_width(110.0)
                                                .hint_text("DD/MM/AAAA")
                                                .horizontal_align(egui::Align::Center),
                                        );
                                        ui.end_row();

                                        ui.label("Hasta:");
                                        ui.add(
                                            egui::TextEdit::singleline(&mut self.hasta)
                                                .desired_width(110.0)
                                                .hint_text("DD/MM/AAAA")
                                                .horizontal_align(egui::Align::Center),
                                        );
                                        ui.end_row();
                                    });
                            });
                    },
                );

                if self.tipo != tipo_anterior {
                    self.proponer_rango();
                }

                ui.add_space(20.0);

                let button_width = 200.0;
                let hay_archivo = self.sesion.archivo().is_some();

                if ui
                    .add_sized([button_width, 32.0], egui::Button::new("📂  Cargar Excel"))
                    .clicked()
                {
                    self.cargar_excel();
                }

                ui.add_space(8.0);

                // Sin archivo cargado no hay nada que reportar
                ui.add_enabled_ui(hay_archivo, |ui| {
                    if ui
                        .add_sized([button_width, 32.0], egui::Button::new("📄  Generar PDF"))
                        .clicked()
                    {
                        let resultado = self.generar_pdf();
                        self.informar(resultado);
                    }

                    ui.add_space(8.0);

                    if ui
                        .add_sized([button_width, 32.0], egui::Button::new("📊  Exportar detalle"))
                        .clicked()
                    {
                        let resultado = self.exportar_detalle();
                        self.informar(resultado);
                    }
                });

                ui.add_space(20.0);

                let (texto, color) = match &self.estado {
                    EstadoApp::Listo => ("Listo", egui::Color32::GRAY),
                    EstadoApp::Finalizado(msg) => (msg.as_str(), egui::Color32::GREEN),
                    EstadoApp::Error(msg) => (msg.as_str(), egui::Color32::RED),
                };
                ui.label(egui::RichText::new(texto).color(color));

                if !self.advertencias.is_empty() {
                    ui.add_space(12.0);
                    ui.label(egui::RichText::new("Advertencias").strong());
                    egui::ScrollArea::vertical()
                        .max_height(140.0)
                        .show(ui, |ui| {
                            for advertencia in &self.advertencias {
                                ui.label(
                                    egui::RichText::new(format!("⚠ {}", advertencia))
                                        .color(egui::Color32::from_rgb(230, 160, 40)),
                                );
                            }
                        });
                }
            });
        });
    }
}

fn cargar_icono(ruta: &Path) -> Option<egui::IconData> {
    match image::open(ruta) {
        Ok(imagen) => {
            let imagen = imagen.into_rgba8();
            let (width, height) = imagen.dimensions();
            Some(egui::IconData {
                rgba: imagen.into_raw(),
                width,
                height,
            })
        }
        Err(e) => {
            warn!("No se pudo cargar el icono {}: {}", ruta.display(), e);
            None
        }
    }
}

/// Ejecuta la aplicación GUI
pub fn run(config: Result<Config>) -> eframe::Result<()> {
    let mut viewport = egui::ViewportBuilder::default()
        .with_inner_size([440.0, 560.0])
        .with_min_inner_size([380.0, 480.0]);

    if let Some(icono) = config
        .as_ref()
        .ok()
        .and_then(|c| c.ruta_icono.as_deref())
        .and_then(cargar_icono)
    {
        viewport = viewport.with_icon(icono);
    }

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Reporte de Dotación",
        options,
        Box::new(move |cc| Ok(Box::new(ReporteDotacionApp::new(cc, config)))),
    )
}
