//! Reportes de dotación a partir de exportaciones de personal en Excel.
//!
//! El flujo es: [`reporte::Sesion`] carga el Excel, [`reporte::generar`] arma
//! el [`reporte::Reporte`] y [`pdf_reporte::renderizar`] lo lleva a PDF.

pub mod agregador;
pub mod config;
pub mod diferencias;
pub mod error;
pub mod excel_handler;
pub mod gui;
pub mod metricas;
pub mod modelo;
pub mod normalizador;
pub mod pdf_reporte;
pub mod periodo;
pub mod reporte;
