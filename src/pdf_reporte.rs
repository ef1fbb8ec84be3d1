//! Renderizado del reporte a PDF con lopdf.
//!
//! Un único renderizador para todos los tipos de reporte: recibe las tablas ya
//! calculadas y sólo se ocupa de la disposición en páginas A4.

use crate::agregador::{TablaCruzada, TablaFrecuencias};
use crate::error::Resultado;
use crate::metricas::formatear_fecha;
use crate::reporte::{Reporte, TablaDetalle};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tracing::debug;

const ANCHO_PAGINA: f32 = 595.0;
const ALTO_PAGINA: f32 = 842.0;
const MARGEN: f32 = 40.0;
const MARGEN_INFERIOR: f32 = 50.0;
const ALTO_FILA: f32 = 14.0;
const TAMANIO_TABLA: f32 = 8.0;

type Color = (f32, f32, f32);

const AZUL: Color = (0.11, 0.27, 0.53);
const AZUL_CLARO: Color = (0.87, 0.91, 0.97);
const GRIS: Color = (0.45, 0.45, 0.45);
const GRIS_CLARO: Color = (0.95, 0.95, 0.95);
const NEGRO: Color = (0.0, 0.0, 0.0);
const BLANCO: Color = (1.0, 1.0, 1.0);
const NARANJA: Color = (0.80, 0.40, 0.05);

#[derive(Clone, Copy, PartialEq)]
enum Fuente {
    Normal,
    Negrita,
}

impl Fuente {
    fn recurso(&self) -> &'static str {
        match self {
            Fuente::Normal => "F1",
            Fuente::Negrita => "F2",
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Alineacion {
    Izquierda,
    Derecha,
}

/// Convierte a WinAnsi. Los caracteres fuera de Latin-1 se reemplazan.
fn codificar(texto: &str) -> Vec<u8> {
    texto
        .chars()
        .map(|c| match c {
            '–' | '—' => b'-',
            '“' | '”' => b'"',
            '‘' | '’' => b'\'',
            c if (c as u32) < 0x100 => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Ancho aproximado de un texto en Helvetica.
fn ancho_texto(texto: &str, tamanio: f32) -> f32 {
    texto.chars().count() as f32 * tamanio * 0.5
}

/// Recorta el texto para que entre en el ancho dado.
fn recortar(texto: &str, ancho: f32, tamanio: f32) -> String {
    let maximo = ((ancho - 4.0) / (tamanio * 0.5)).max(1.0) as usize;
    if texto.chars().count() <= maximo {
        return texto.to_string();
    }
    let mut recortado: String = texto.chars().take(maximo.saturating_sub(1)).collect();
    recortado.push('.');
    recortado
}

/// Páginas en construcción y posición vertical actual.
struct Lienzo {
    paginas: Vec<Vec<Operation>>,
    y: f32,
    titulo: String,
    subtitulo: String,
}

impl Lienzo {
    fn new(titulo: &str, subtitulo: &str) -> Self {
        let mut lienzo = Lienzo {
            paginas: Vec::new(),
            y: ALTO_PAGINA,
            titulo: titulo.to_string(),
            subtitulo: subtitulo.to_string(),
        };
        lienzo.nueva_pagina();
        lienzo
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        if self.paginas.is_empty() {
            self.paginas.push(Vec::new());
        }
        let ultima = self.paginas.len() - 1;
        &mut self.paginas[ultima]
    }

    fn nueva_pagina(&mut self) {
        self.paginas.push(Vec::new());

        // Banda de encabezado
        self.rectangulo(0.0, ALTO_PAGINA - 60.0, ANCHO_PAGINA, 60.0, AZUL);
        let titulo = self.titulo.clone();
        let subtitulo = self.subtitulo.clone();
        self.texto(MARGEN, ALTO_PAGINA - 32.0, 16.0, Fuente::Negrita, BLANCO, &titulo);
        self.texto(MARGEN, ALTO_PAGINA - 48.0, 9.0, Fuente::Normal, BLANCO, &subtitulo);

        self.y = ALTO_PAGINA - 85.0;
    }

    /// Salta de página si no quedan `alto` puntos. Devuelve true si saltó.
    fn asegurar(&mut self, alto: f32) -> bool {
        if self.y - alto < MARGEN_INFERIOR {
            self.nueva_pagina();
            true
        } else {
            false
        }
    }

    fn color_relleno(&mut self, color: Color) {
        self.ops().push(Operation::new(
            "rg",
            vec![color.0.into(), color.1.into(), color.2.into()],
        ));
    }

    fn texto(&mut self, x: f32, y: f32, tamanio: f32, fuente: Fuente, color: Color, texto: &str) {
        self.color_relleno(color);
        let ops = self.ops();
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![fuente.recurso().into(), tamanio.into()],
        ));
        ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(codificar(texto))],
        ));
        ops.push(Operation::new("ET", vec![]));
    }

    fn rectangulo(&mut self, x: f32, y: f32, ancho: f32, alto: f32, color: Color) {
        self.color_relleno(color);
        self.ops().push(Operation::new(
            "re",
            vec![x.into(), y.into(), ancho.into(), alto.into()],
        ));
        self.ops().push(Operation::new("f", vec![]));
    }

    fn linea(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Color) {
        let ops = self.ops();
        ops.push(Operation::new(
            "RG",
            vec![color.0.into(), color.1.into(), color.2.into()],
        ));
        ops.push(Operation::new("w", vec![0.5f32.into()]));
        ops.push(Operation::new("m", vec![x1.into(), y1.into()]));
        ops.push(Operation::new("l", vec![x2.into(), y2.into()]));
        ops.push(Operation::new("S", vec![]));
    }

    fn titulo_seccion(&mut self, titulo: &str) {
        self.asegurar(40.0);
        self.y -= 14.0;
        self.texto(MARGEN, self.y, 12.0, Fuente::Negrita, AZUL, titulo);
        self.y -= 4.0;
        let y = self.y;
        self.linea(MARGEN, y, ANCHO_PAGINA - MARGEN, y, AZUL);
        self.y -= 8.0;
    }

    fn parrafo(&mut self, texto: &str, tamanio: f32, color: Color) {
        let ancho = ANCHO_PAGINA - 2.0 * MARGEN;
        let maximo = (ancho / (tamanio * 0.5)) as usize;
        for renglon in partir_renglones(texto, maximo.max(10)) {
            self.asegurar(tamanio + 4.0);
            self.y -= tamanio + 4.0;
            self.texto(MARGEN, self.y, tamanio, Fuente::Normal, color, &renglon);
        }
    }

    fn celda(&mut self, x: f32, ancho: f32, texto: &str, fuente: Fuente, color: Color, alineacion: Alineacion) {
        let texto = recortar(texto, ancho, TAMANIO_TABLA);
        let y = self.y + 4.0;
        let x_texto = match alineacion {
            Alineacion::Izquierda => x + 3.0,
            Alineacion::Derecha => x + ancho - 3.0 - ancho_texto(&texto, TAMANIO_TABLA),
        };
        self.texto(x_texto, y, TAMANIO_TABLA, fuente, color, &texto);
    }

    /// Dibuja una tabla; repite el encabezado en cada página nueva.
    fn tabla(
        &mut self,
        encabezados: &[String],
        filas: &[Vec<String>],
        anchos: &[f32],
        alineaciones: &[Alineacion],
        ultima_es_total: bool,
    ) {
        let dibujar_encabezado = |lienzo: &mut Lienzo| {
            lienzo.y -= ALTO_FILA;
            let ancho_total: f32 = anchos.iter().sum();
            lienzo.rectangulo(MARGEN, lienzo.y, ancho_total, ALTO_FILA, AZUL);
            let mut x = MARGEN;
            for (i, encabezado) in encabezados.iter().enumerate() {
                let ancho = anchos.get(i).copied().unwrap_or(40.0);
                let alineacion = alineaciones.get(i).copied().unwrap_or(Alineacion::Izquierda);
                lienzo.celda(x, ancho, encabezado, Fuente::Negrita, BLANCO, alineacion);
                x += ancho;
            }
        };

        self.asegurar(ALTO_FILA * 3.0);
        dibujar_encabezado(self);

        let ancho_total: f32 = anchos.iter().sum();
        for (n, fila) in filas.iter().enumerate() {
            if self.asegurar(ALTO_FILA) {
                dibujar_encabezado(self);
            }
            self.y -= ALTO_FILA;

            let es_total = ultima_es_total && n + 1 == filas.len();
            if es_total {
                self.rectangulo(MARGEN, self.y, ancho_total, ALTO_FILA, AZUL_CLARO);
            } else if n % 2 == 1 {
                self.rectangulo(MARGEN, self.y, ancho_total, ALTO_FILA, GRIS_CLARO);
            }

            let fuente = if es_total { Fuente::Negrita } else { Fuente::Normal };
            let mut x = MARGEN;
            for (i, valor) in fila.iter().enumerate() {
                let ancho = anchos.get(i).copied().unwrap_or(40.0);
                let alineacion = alineaciones.get(i).copied().unwrap_or(Alineacion::Izquierda);
                self.celda(x, ancho, valor, fuente, NEGRO, alineacion);
                x += ancho;
            }
        }
        self.y -= 10.0;
    }

    /// Agrega el pie con el número de página a cada página.
    fn finalizar(mut self, pie: &str) -> Vec<Vec<Operation>> {
        let total = self.paginas.len();
        for (i, pagina) in self.paginas.iter_mut().enumerate() {
            let numero = format!("Página {} de {}", i + 1, total);
            let mut pie_ops = Lienzo {
                paginas: vec![Vec::new()],
                y: 0.0,
                titulo: String::new(),
                subtitulo: String::new(),
            };
            pie_ops.linea(MARGEN, 35.0, ANCHO_PAGINA - MARGEN, 35.0, GRIS);
            pie_ops.texto(MARGEN, 24.0, 8.0, Fuente::Normal, GRIS, pie);
            let x = ANCHO_PAGINA - MARGEN - ancho_texto(&numero, 8.0);
            pie_ops.texto(x, 24.0, 8.0, Fuente::Normal, GRIS, &numero);
            pagina.extend(pie_ops.paginas.into_iter().flatten());
        }
        self.paginas
    }
}

fn partir_renglones(texto: &str, maximo: usize) -> Vec<String> {
    let mut renglones = Vec::new();
    let mut actual = String::new();
    for palabra in texto.split_whitespace() {
        if !actual.is_empty() && actual.chars().count() + 1 + palabra.chars().count() > maximo {
            renglones.push(std::mem::take(&mut actual));
        }
        if !actual.is_empty() {
            actual.push(' ');
        }
        actual.push_str(palabra);
    }
    if !actual.is_empty() {
        renglones.push(actual);
    }
    renglones
}

/// Anchos repartidos: la primera columna fija y el resto en partes iguales.
fn anchos_tabla_cruzada(columnas: usize) -> Vec<f32> {
    let disponible = ANCHO_PAGINA - 2.0 * MARGEN;
    let primera = 110.0;
    let resto = if columnas > 1 {
        (disponible - primera) / (columnas - 1) as f32
    } else {
        0.0
    };
    std::iter::once(primera)
        .chain(std::iter::repeat(resto).take(columnas.saturating_sub(1)))
        .collect()
}

fn dibujar_kpis(lienzo: &mut Lienzo, reporte: &Reporte) {
    let mut cajas = vec![
        ("Dotación activa", reporte.kpis.activos),
        ("Altas", reporte.kpis.altas),
        ("Bajas", reporte.kpis.bajas),
    ];
    if let Some(cambios) = reporte.kpis.cambios_organizativos {
        cajas.push(("Cambios organizativos", cambios));
    }

    let separacion = 10.0;
    let disponible = ANCHO_PAGINA - 2.0 * MARGEN;
    let ancho = (disponible - separacion * (cajas.len() - 1) as f32) / cajas.len() as f32;
    let alto = 50.0;

    lienzo.asegurar(alto + 10.0);
    lienzo.y -= alto;
    let y = lienzo.y;

    for (i, (rotulo, valor)) in cajas.iter().enumerate() {
        let x = MARGEN + i as f32 * (ancho + separacion);
        lienzo.rectangulo(x, y, ancho, alto, AZUL_CLARO);
        lienzo.rectangulo(x, y + alto - 4.0, ancho, 4.0, AZUL);
        let numero = valor.to_string();
        let x_numero = x + (ancho - ancho_texto(&numero, 20.0)) / 2.0;
        lienzo.texto(x_numero, y + 18.0, 20.0, Fuente::Negrita, AZUL, &numero);
        let x_rotulo = x + (ancho - ancho_texto(rotulo, 8.0)) / 2.0;
        lienzo.texto(x_rotulo, y + 6.0, 8.0, Fuente::Normal, GRIS, rotulo);
    }
    lienzo.y -= 12.0;
}

fn dibujar_tabla_cruzada(lienzo: &mut Lienzo, tabla: &TablaCruzada) {
    lienzo.titulo_seccion(&tabla.titulo);
    if tabla.total_general() == 0 {
        lienzo.parrafo("Sin registros.", 9.0, GRIS);
        lienzo.y -= 6.0;
        return;
    }

    let con_promedios = tabla.antiguedad_promedio.is_some() && tabla.edad_promedio.is_some();

    let mut encabezados = vec![tabla.titulo_filas.clone()];
    encabezados.extend(tabla.columnas.iter().cloned());
    if con_promedios {
        encabezados.push("Antig. prom.".to_string());
        encabezados.push("Edad prom.".to_string());
    }

    let filas: Vec<Vec<String>> = tabla
        .filas
        .iter()
        .enumerate()
        .map(|(i, rotulo)| {
            let mut fila = vec![rotulo.clone()];
            fila.extend((0..tabla.columnas.len()).map(|j| tabla.celda_texto(i, j)));
            if let (Some(antiguedades), Some(edades)) =
                (&tabla.antiguedad_promedio, &tabla.edad_promedio)
            {
                fila.push(format!("{:.1}", antiguedades.get(i).copied().unwrap_or(0.0)));
                fila.push(format!("{:.1}", edades.get(i).copied().unwrap_or(0.0)));
            }
            fila
        })
        .collect();

    let anchos = anchos_tabla_cruzada(encabezados.len());
    let alineaciones: Vec<Alineacion> = (0..encabezados.len())
        .map(|i| if i == 0 { Alineacion::Izquierda } else { Alineacion::Derecha })
        .collect();

    lienzo.tabla(&encabezados, &filas, &anchos, &alineaciones, true);
}

fn dibujar_frecuencias(lienzo: &mut Lienzo, tabla: &TablaFrecuencias) {
    lienzo.titulo_seccion(&tabla.titulo);
    if tabla.total == 0 {
        lienzo.parrafo("Sin registros.", 9.0, GRIS);
        lienzo.y -= 6.0;
        return;
    }

    let encabezados = vec![tabla.titulo_clave.clone(), "Cantidad".to_string()];
    let mut filas: Vec<Vec<String>> = tabla
        .filas
        .iter()
        .map(|(clave, n)| vec![clave.clone(), n.to_string()])
        .collect();
    filas.push(vec!["Total".to_string(), tabla.total.to_string()]);

    lienzo.tabla(
        &encabezados,
        &filas,
        &[260.0, 80.0],
        &[Alineacion::Izquierda, Alineacion::Derecha],
        true,
    );
}

fn dibujar_detalle(lienzo: &mut Lienzo, tabla: &TablaDetalle) {
    lienzo.titulo_seccion(&tabla.titulo);
    if tabla.filas.is_empty() {
        lienzo.parrafo("Sin registros.", 9.0, GRIS);
        lienzo.y -= 6.0;
        return;
    }

    let filas: Vec<Vec<String>> = tabla
        .filas
        .iter()
        .map(|fila| fila.iter().map(|v| v.to_string()).collect())
        .collect();

    // El ancho de cada columna es proporcional a su contenido más largo
    let pesos: Vec<f32> = tabla
        .encabezados
        .iter()
        .enumerate()
        .map(|(i, encabezado)| {
            let mas_largo = filas
                .iter()
                .filter_map(|f| f.get(i))
                .map(|v| v.chars().count())
                .max()
                .unwrap_or(0);
            encabezado.chars().count().max(mas_largo).clamp(6, 28) as f32
        })
        .collect();
    let suma: f32 = pesos.iter().sum();
    let disponible = ANCHO_PAGINA - 2.0 * MARGEN;
    let anchos: Vec<f32> = pesos.iter().map(|p| p / suma * disponible).collect();
    let alineaciones = vec![Alineacion::Izquierda; anchos.len()];

    lienzo.tabla(&tabla.encabezados, &filas, &anchos, &alineaciones, false);
}

/// Genera el PDF del reporte y devuelve sus bytes.
pub fn renderizar(reporte: &Reporte) -> Resultado<Vec<u8>> {
    let subtitulo = format!(
        "Período: {} al {}  |  Fecha de referencia: {}  |  Archivo: {}",
        formatear_fecha(Some(reporte.solicitud.inicio)),
        formatear_fecha(Some(reporte.solicitud.fin)),
        formatear_fecha(Some(reporte.fecha_referencia)),
        reporte.archivo
    );
    let mut lienzo = Lienzo::new(reporte.titulo(), &subtitulo);

    dibujar_kpis(&mut lienzo, reporte);
    dibujar_tabla_cruzada(&mut lienzo, &reporte.activos);
    dibujar_tabla_cruzada(&mut lienzo, &reporte.altas);
    dibujar_tabla_cruzada(&mut lienzo, &reporte.bajas);
    dibujar_frecuencias(&mut lienzo, &reporte.motivos_baja);

    for detalle in &reporte.detalles {
        dibujar_detalle(&mut lienzo, detalle);
    }

    if !reporte.advertencias.is_empty() {
        lienzo.titulo_seccion("Advertencias");
        for advertencia in &reporte.advertencias {
            lienzo.parrafo(&format!("- {}", advertencia), 9.0, NARANJA);
        }
    }

    let pie = format!(
        "Generado el {}",
        reporte.generado.format("%d/%m/%Y %H:%M")
    );
    let paginas = lienzo.finalizar(&pie);
    debug!("PDF con {} páginas", paginas.len());

    armar_documento(paginas, reporte.titulo())
}

fn armar_documento(paginas: Vec<Vec<Operation>>, titulo: &str) -> Resultado<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let fuente_normal = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let fuente_negrita = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => fuente_normal,
            "F2" => fuente_negrita,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(paginas.len());
    for operaciones in paginas {
        let content = Content { operations: operaciones };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let cantidad = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => cantidad,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), ANCHO_PAGINA.into(), ALTO_PAGINA.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(codificar(titulo)),
        "Producer" => Object::string_literal("reporte-dotacion"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
