use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::NaiveDate;
use lopdf::Document;
use reporte_dotacion::config::Config;
use reporte_dotacion::error::{Advertencia, ErrorReporte};
use reporte_dotacion::excel_handler;
use reporte_dotacion::modelo::Categoria;
use reporte_dotacion::normalizador::fecha_de_celda;
use reporte_dotacion::pdf_reporte;
use reporte_dotacion::periodo::TipoReporte;
use reporte_dotacion::reporte::{self, Sesion, SolicitudReporte};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ENCABEZADOS: [&str; 9] = [
    "Legajo",
    "Apellido y Nombre",
    "Estado de Ocupación",
    "Fecha de Ingreso",
    "Desde",
    "Fecha de Nacimiento",
    "Línea",
    "Categoría",
    "Motivo de Baja",
];

fn fecha(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Fila<'a> {
    legajo: f64,
    nombre: &'a str,
    estado: &'a str,
    ingreso: (u16, u8, u8),
    desde: Option<&'a str>,
    nacimiento: &'a str,
    linea: &'a str,
    categoria: &'a str,
    motivo: &'a str,
}

fn escribir_libro(dir: &Path, con_co: bool) -> PathBuf {
    let mut workbook = Workbook::new();
    let formato_fecha = Format::new().set_num_format("dd/mm/yyyy");

    let base = [
        Fila {
            legajo: 100.0,
            nombre: "Pérez, Ana",
            estado: "Activo",
            ingreso: (2015, 3, 1),
            desde: None,
            nacimiento: "10/05/1980",
            linea: "Línea A",
            categoria: "Operario",
            motivo: "",
        },
        Fila {
            legajo: 101.0,
            nombre: "Gómez, Luis",
            estado: "Activo",
            ingreso: (2024, 3, 5),
            desde: None,
            nacimiento: "22/11/1998",
            linea: "Línea B",
            categoria: "Operario",
            motivo: "",
        },
        Fila {
            legajo: 102.0,
            nombre: "Ruiz, Marta",
            estado: "Baja",
            ingreso: (2018, 6, 1),
            desde: Some("11/03/2024"),
            nacimiento: "02/02/1975",
            linea: "Línea A",
            categoria: "Técnico",
            motivo: "Renuncia",
        },
    ];

    let hoja = workbook.add_worksheet();
    hoja.set_name("Consulta Base").unwrap();
    for (col, titulo) in ENCABEZADOS.iter().enumerate() {
        hoja.write_string(0, col as u16, *titulo).unwrap();
    }
    for (i, fila) in base.iter().enumerate() {
        let row = (i + 1) as u32;
        let (y, m, d) = fila.ingreso;
        let ingreso = ExcelDateTime::from_ymd(y, m, d).unwrap();
        hoja.write_number(row, 0, fila.legajo).unwrap();
        hoja.write_string(row, 1, fila.nombre).unwrap();
        hoja.write_string(row, 2, fila.estado).unwrap();
        hoja.write_datetime_with_format(row, 3, &ingreso, &formato_fecha)
            .unwrap();
        if let Some(desde) = fila.desde {
            hoja.write_string(row, 4, desde).unwrap();
        }
        hoja.write_string(row, 5, fila.nacimiento).unwrap();
        hoja.write_string(row, 6, fila.linea).unwrap();
        hoja.write_string(row, 7, fila.categoria).unwrap();
        hoja.write_string(row, 8, fila.motivo).unwrap();
    }

    let hoja = workbook.add_worksheet();
    hoja.set_name("Activos").unwrap();
    hoja.write_string(0, 0, "Legajo").unwrap();
    hoja.write_string(0, 1, "Apellido y Nombre").unwrap();
    hoja.write_string(0, 2, "Línea").unwrap();
    hoja.write_string(0, 3, "Categoría").unwrap();
    for (row, (legajo, nombre)) in [(100.0, "Pérez, Ana"), (102.0, "Ruiz, Marta"), (104.0, "Sosa, Iván")]
        .iter()
        .enumerate()
    {
        let row = (row + 1) as u32;
        hoja.write_number(row, 0, *legajo).unwrap();
        hoja.write_string(row, 1, *nombre).unwrap();
        hoja.write_string(row, 2, "Línea A").unwrap();
        hoja.write_string(row, 3, "Operario").unwrap();
    }

    if con_co {
        let hoja = workbook.add_worksheet();
        hoja.set_name("CO").unwrap();
        hoja.write_string(0, 0, "Legajo").unwrap();
        hoja.write_string(0, 1, "Apellido y Nombre").unwrap();
        hoja.write_string(0, 2, "Línea").unwrap();
        hoja.write_string(0, 3, "Categoría").unwrap();
        hoja.write_number(1, 0, 104.0).unwrap();
        hoja.write_string(1, 1, "Sosa, Iván").unwrap();
        hoja.write_string(1, 2, "Línea C").unwrap();
        hoja.write_string(1, 3, "Supervisor").unwrap();
    }

    let ruta = dir.join("personal.xlsx");
    workbook.save(&ruta).unwrap();
    ruta
}

fn config_de_prueba(dir: &Path) -> Config {
    Config {
        ruta_salida: dir.to_path_buf(),
        ..Config::default()
    }
}

fn sesion_cargada(dir: &TempDir, con_co: bool) -> Sesion {
    let ruta = escribir_libro(dir.path(), con_co);
    let mut sesion = Sesion::new();
    sesion.cargar(&ruta).unwrap();
    sesion
}

#[test]
fn reporte_diario_desde_archivo() {
    let dir = TempDir::new().unwrap();
    let sesion = sesion_cargada(&dir, true);
    let config = config_de_prueba(dir.path());
    assert_eq!(sesion.archivo().unwrap().nombre, "personal.xlsx");

    let hoy = fecha(2024, 3, 12);
    let solicitud = SolicitudReporte::nueva(TipoReporte::Diario, None, None, hoy).unwrap();
    let reporte = reporte::generar(&sesion, &solicitud, &config).unwrap();

    assert_eq!(reporte.kpis.activos, 2);
    assert_eq!(reporte.kpis.altas, 1);
    assert_eq!(reporte.kpis.bajas, 1);
    assert_eq!(reporte.kpis.cambios_organizativos, Some(1));
    assert!(reporte.advertencias.is_empty());

    // la fecha de egreso es el día anterior a "Desde"
    let bajas = reporte.detalles.iter().find(|d| d.hoja == "Bajas").unwrap();
    assert_eq!(bajas.filas[0][4].to_string(), "10/03/2024");

    let cambios = reporte
        .detalles
        .iter()
        .find(|d| d.hoja == "Cambios Organizativos")
        .unwrap();
    assert_eq!(cambios.filas.len(), 1);
    assert_eq!(cambios.filas[0][0].to_string(), "104");

    let pdf = pdf_reporte::renderizar(&reporte).unwrap();
    let doc = Document::load_mem(&pdf).unwrap();
    assert!(!doc.get_pages().is_empty());
}

#[test]
fn sin_hoja_co_usa_la_nomina_anterior() {
    let dir = TempDir::new().unwrap();
    let sesion = sesion_cargada(&dir, false);
    let config = config_de_prueba(dir.path());

    let solicitud =
        SolicitudReporte::nueva(TipoReporte::Diario, None, None, fecha(2024, 3, 12)).unwrap();
    let reporte = reporte::generar(&sesion, &solicitud, &config).unwrap();

    assert_eq!(reporte.kpis.cambios_organizativos, Some(1));
    assert!(reporte
        .advertencias
        .iter()
        .any(|a| matches!(a, Advertencia::SinHojaCambios { cantidad: 1, .. })));
}

#[test]
fn reporte_mensual_y_detalle_en_excel() {
    let dir = TempDir::new().unwrap();
    let sesion = sesion_cargada(&dir, true);
    let config = config_de_prueba(dir.path());

    let solicitud = SolicitudReporte::nueva(
        TipoReporte::Mensual,
        Some(fecha(2024, 3, 1)),
        Some(fecha(2024, 3, 31)),
        fecha(2024, 4, 2),
    )
    .unwrap();
    let reporte = reporte::generar(&sesion, &solicitud, &config).unwrap();

    assert_eq!(reporte.kpis.altas, 1);
    assert_eq!(reporte.kpis.bajas, 1);
    // 100 y 101; 102 egresó el 10/03
    assert_eq!(reporte.kpis.activos, 2);
    assert_eq!(reporte.kpis.cambios_organizativos, None);
    assert_eq!(reporte.motivos_baja.filas, vec![("Renuncia".to_string(), 1)]);

    let ruta = dir.path().join(reporte.nombre_archivo("xlsx"));
    excel_handler::guardar_detalle(&reporte, &ruta).unwrap();

    let mut libro: Xlsx<_> = open_workbook(&ruta).unwrap();
    assert_eq!(libro.sheet_names(), vec!["Altas".to_string(), "Bajas".to_string()]);

    let bajas = libro.worksheet_range("Bajas").unwrap();
    assert_eq!(
        bajas.get_value((0, 0)),
        Some(&Data::String("Legajo".to_string()))
    );
    assert_eq!(
        bajas.get_value((1, 0)),
        Some(&Data::String("102".to_string()))
    );
    let egreso = bajas.get_value((1, 4)).and_then(fecha_de_celda);
    assert_eq!(egreso, Some(fecha(2024, 3, 10)));
}

#[test]
fn reporte_anual_recategoriza_altas() {
    let dir = TempDir::new().unwrap();
    let sesion = sesion_cargada(&dir, true);
    let config = config_de_prueba(dir.path());

    let solicitud =
        SolicitudReporte::nueva(TipoReporte::Anual, None, None, fecha(2024, 6, 1)).unwrap();
    let reporte = reporte::generar(&sesion, &solicitud, &config).unwrap();

    assert_eq!(reporte.altas.filas, vec!["Ingresante", "Total"]);
    assert!(reporte.advertencias.iter().any(|a| matches!(
        a,
        Advertencia::NormalizacionAnual {
            cantidad: 1,
            categoria: Categoria::Ingresante
        }
    )));

    let altas = reporte.detalles.iter().find(|d| d.hoja == "Altas").unwrap();
    assert!(altas.encabezados.iter().any(|e| e == "Categoría original"));
}

#[test]
fn sin_archivo_cargado_es_error() {
    let dir = TempDir::new().unwrap();
    let config = config_de_prueba(dir.path());
    let solicitud =
        SolicitudReporte::nueva(TipoReporte::Diario, None, None, fecha(2024, 3, 12)).unwrap();

    let resultado = reporte::generar(&Sesion::new(), &solicitud, &config);
    assert!(matches!(resultado, Err(ErrorReporte::SinArchivo)));
}

#[test]
fn rango_invertido_es_error() {
    let resultado = SolicitudReporte::nueva(
        TipoReporte::Semanal,
        Some(fecha(2024, 3, 10)),
        Some(fecha(2024, 3, 1)),
        fecha(2024, 3, 12),
    );
    assert!(matches!(resultado, Err(ErrorReporte::RangoInvalido { .. })));
}
