//! Tablas cruzadas con totales marginales y tablas de frecuencia.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;

/// Rótulo de la fila y la columna de totales.
pub const TOTAL: &str = "Total";

/// Conteos por fila y columna, con fila y columna "Total" al final.
///
/// Los valores son números; el guion para los ceros sólo aparece en
/// [`TablaCruzada::celda_texto`].
#[derive(Debug, Clone, PartialEq)]
pub struct TablaCruzada {
    pub titulo: String,
    pub titulo_filas: String,
    pub filas: Vec<String>,
    pub columnas: Vec<String>,
    pub valores: Vec<Vec<u32>>,
    /// Promedios por fila (incluida la de totales), si se calcularon.
    pub antiguedad_promedio: Option<Vec<f64>>,
    pub edad_promedio: Option<Vec<f64>>,
}

impl TablaCruzada {
    pub fn celda(&self, fila: usize, columna: usize) -> u32 {
        self.valores
            .get(fila)
            .and_then(|f| f.get(columna))
            .copied()
            .unwrap_or(0)
    }

    /// Valor para mostrar: los ceros se ven como "-".
    pub fn celda_texto(&self, fila: usize, columna: usize) -> String {
        match self.celda(fila, columna) {
            0 => "-".to_string(),
            n => n.to_string(),
        }
    }

    pub fn total_general(&self) -> u32 {
        self.valores
            .last()
            .and_then(|f| f.last())
            .copied()
            .unwrap_or(0)
    }

    /// Cantidad de filas de datos, sin contar la de totales.
    pub fn filas_de_datos(&self) -> usize {
        self.filas.len().saturating_sub(1)
    }
}

/// Cuenta `items` por `fila` × `columna` y agrega los márgenes.
///
/// Filas y columnas siguen el orden de las claves (`Ord`), que para líneas y
/// categorías es el orden fijo del vocabulario. Sólo aparecen los valores
/// presentes en los datos.
pub fn tabla_cruzada<T, KF, KC>(
    titulo: &str,
    titulo_filas: &str,
    items: &[T],
    fila: impl Fn(&T) -> KF,
    columna: impl Fn(&T) -> KC,
) -> TablaCruzada
where
    KF: Ord + Display,
    KC: Ord + Display + Clone,
{
    let mut conteos: BTreeMap<KF, BTreeMap<KC, u32>> = BTreeMap::new();
    let mut claves_columnas: BTreeSet<KC> = BTreeSet::new();

    for item in items {
        let kc = columna(item);
        claves_columnas.insert(kc.clone());
        *conteos
            .entry(fila(item))
            .or_default()
            .entry(kc)
            .or_default() += 1;
    }

    let columnas_ordenadas: Vec<&KC> = claves_columnas.iter().collect();
    let ancho = columnas_ordenadas.len();

    let mut filas = Vec::with_capacity(conteos.len() + 1);
    let mut valores: Vec<Vec<u32>> = Vec::with_capacity(conteos.len() + 1);
    let mut totales_columna = vec![0u32; ancho + 1];

    for (kf, por_columna) in &conteos {
        let mut fila_valores: Vec<u32> = columnas_ordenadas
            .iter()
            .map(|kc| por_columna.get(*kc).copied().unwrap_or(0))
            .collect();
        let total_fila: u32 = fila_valores.iter().sum();
        fila_valores.push(total_fila);

        for (acumulado, valor) in totales_columna.iter_mut().zip(&fila_valores) {
            *acumulado += valor;
        }

        filas.push(kf.to_string());
        valores.push(fila_valores);
    }

    filas.push(TOTAL.to_string());
    valores.push(totales_columna);

    let mut columnas: Vec<String> = columnas_ordenadas.iter().map(|k| k.to_string()).collect();
    columnas.push(TOTAL.to_string());

    TablaCruzada {
        titulo: titulo.to_string(),
        titulo_filas: titulo_filas.to_string(),
        filas,
        columnas,
        valores,
        antiguedad_promedio: None,
        edad_promedio: None,
    }
}

/// Agrega promedios de antigüedad y edad por fila.
///
/// El promedio de la fila "Total" se toma sobre toda la población, no como
/// promedio de los promedios por fila.
pub fn con_promedios<T, KF>(
    mut tabla: TablaCruzada,
    items: &[T],
    fila: impl Fn(&T) -> KF,
    antiguedad: impl Fn(&T) -> f64,
    edad: impl Fn(&T) -> f64,
) -> TablaCruzada
where
    KF: Display,
{
    let mut sumas: HashMap<String, (f64, f64, usize)> = HashMap::new();
    let mut total = (0.0, 0.0, 0usize);

    for item in items {
        let (a, e) = (antiguedad(item), edad(item));
        let entrada = sumas.entry(fila(item).to_string()).or_insert((0.0, 0.0, 0));
        entrada.0 += a;
        entrada.1 += e;
        entrada.2 += 1;
        total.0 += a;
        total.1 += e;
        total.2 += 1;
    }

    let promedio = |suma: f64, n: usize| if n == 0 { 0.0 } else { suma / n as f64 };

    let mut antiguedades = Vec::with_capacity(tabla.filas.len());
    let mut edades = Vec::with_capacity(tabla.filas.len());
    for (i, rotulo) in tabla.filas.iter().enumerate() {
        let (sa, se, n) = if i + 1 == tabla.filas.len() {
            total
        } else {
            sumas.get(rotulo).copied().unwrap_or((0.0, 0.0, 0))
        };
        antiguedades.push(promedio(sa, n));
        edades.push(promedio(se, n));
    }

    tabla.antiguedad_promedio = Some(antiguedades);
    tabla.edad_promedio = Some(edades);
    tabla
}

/// Frecuencias de un valor, de mayor a menor, con total.
#[derive(Debug, Clone, PartialEq)]
pub struct TablaFrecuencias {
    pub titulo: String,
    pub titulo_clave: String,
    pub filas: Vec<(String, u32)>,
    pub total: u32,
}

pub fn frecuencias<T>(
    titulo: &str,
    titulo_clave: &str,
    items: &[T],
    clave: impl Fn(&T) -> String,
) -> TablaFrecuencias {
    let mut conteos: HashMap<String, u32> = HashMap::new();
    for item in items {
        *conteos.entry(clave(item)).or_default() += 1;
    }

    let mut filas: Vec<(String, u32)> = conteos.into_iter().collect();
    filas.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let total = filas.iter().map(|(_, n)| n).sum();

    TablaFrecuencias {
        titulo: titulo.to_string(),
        titulo_clave: titulo_clave.to_string(),
        filas,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modelo::{Categoria, Linea};
    use approx::assert_abs_diff_eq;

    struct Obs {
        categoria: Categoria,
        linea: Linea,
        antiguedad: f64,
        edad: f64,
    }

    fn obs(categoria: Categoria, linea: Linea, antiguedad: f64, edad: f64) -> Obs {
        Obs {
            categoria,
            linea,
            antiguedad,
            edad,
        }
    }

    fn muestra() -> Vec<Obs> {
        vec![
            obs(Categoria::Operario, Linea::B, 10.0, 40.0),
            obs(Categoria::Operario, Linea::A, 2.0, 30.0),
            obs(Categoria::Jefe, Linea::Premetro, 20.0, 50.0),
            obs(Categoria::Operario, Linea::A, 4.0, 32.0),
            obs(Categoria::Otra("Pasante".to_string()), Linea::A, 0.5, 21.0),
            obs(Categoria::Ingresante, Linea::Otra("Talleres".to_string()), 0.1, 25.0),
        ]
    }

    fn cruzar(items: &[Obs]) -> TablaCruzada {
        tabla_cruzada(
            "Activos",
            "Categoría",
            items,
            |o| o.categoria.clone(),
            |o| o.linea.clone(),
        )
    }

    #[test]
    fn orden_de_vocabulario_y_totales() {
        let t = cruzar(&muestra());

        assert_eq!(
            t.filas,
            vec!["Ingresante", "Operario", "Jefe", "Pasante", "Total"]
        );
        assert_eq!(
            t.columnas,
            vec!["Línea A", "Línea B", "Premetro", "Talleres", "Total"]
        );
        assert_eq!(t.valores[1], vec![2, 1, 0, 0, 3]);
        assert_eq!(t.valores[4], vec![3, 1, 1, 1, 6]);
        assert_eq!(t.total_general(), 6);
        assert_eq!(t.filas_de_datos(), 4);
    }

    #[test]
    fn margenes_cuadran_en_todas_las_celdas() {
        let mut items = muestra();
        for i in 0..40 {
            let categoria = Categoria::CONOCIDAS[i % 8].clone();
            let linea = Linea::CONOCIDAS[(i * 3) % 7].clone();
            items.push(obs(categoria, linea, i as f64, 20.0 + i as f64));
        }
        let t = cruzar(&items);
        let n_filas = t.filas.len();
        let n_cols = t.columnas.len();

        for j in 0..n_cols {
            let suma: u32 = (0..n_filas - 1).map(|i| t.celda(i, j)).sum();
            assert_eq!(t.celda(n_filas - 1, j), suma, "columna {}", j);
        }
        for i in 0..n_filas {
            let suma: u32 = (0..n_cols - 1).map(|j| t.celda(i, j)).sum();
            assert_eq!(t.celda(i, n_cols - 1), suma, "fila {}", i);
        }
        assert_eq!(t.total_general() as usize, items.len());
    }

    #[test]
    fn ceros_se_muestran_con_guion() {
        let t = cruzar(&muestra());
        assert_eq!(t.celda(1, 2), 0);
        assert_eq!(t.celda_texto(1, 2), "-");
        assert_eq!(t.celda_texto(1, 0), "2");
        // el guion no altera los totales
        assert_eq!(t.celda(4, 2), 1);
    }

    #[test]
    fn promedio_total_sobre_toda_la_poblacion() {
        let items = vec![
            obs(Categoria::Operario, Linea::A, 1.0, 30.0),
            obs(Categoria::Operario, Linea::A, 1.0, 30.0),
            obs(Categoria::Operario, Linea::A, 1.0, 30.0),
            obs(Categoria::Jefe, Linea::A, 9.0, 50.0),
        ];
        let t = con_promedios(
            cruzar(&items),
            &items,
            |o| o.categoria.clone(),
            |o| o.antiguedad,
            |o| o.edad,
        );
        let antiguedades = t.antiguedad_promedio.unwrap();
        let edades = t.edad_promedio.unwrap();

        assert_abs_diff_eq!(antiguedades[0], 1.0);
        assert_abs_diff_eq!(antiguedades[1], 9.0);
        // 12 / 4 = 3, no (1 + 9) / 2 = 5
        assert_abs_diff_eq!(antiguedades[2], 3.0);
        assert_abs_diff_eq!(edades[2], 35.0);
    }

    #[test]
    fn tabla_vacia_tiene_solo_totales() {
        let t = cruzar(&[]);
        assert_eq!(t.filas, vec!["Total"]);
        assert_eq!(t.columnas, vec!["Total"]);
        assert_eq!(t.total_general(), 0);

        let t = con_promedios(t, &[] as &[Obs], |o| o.categoria.clone(), |o| o.antiguedad, |o| o.edad);
        assert_eq!(t.antiguedad_promedio, Some(vec![0.0]));
    }

    #[test]
    fn frecuencias_ordenadas_con_total() {
        let motivos = ["Renuncia", "Jubilación", "Renuncia", "Despido", "Renuncia", "Despido"];
        let t = frecuencias("Bajas por motivo", "Motivo", &motivos, |m| m.to_string());
        assert_eq!(
            t.filas,
            vec![
                ("Renuncia".to_string(), 3),
                ("Despido".to_string(), 2),
                ("Jubilación".to_string(), 1),
            ]
        );
        assert_eq!(t.total, 6);
    }
}
