//! Comparación entre la nómina de activos anterior y la consulta base actual.

use crate::error::Advertencia;
use crate::modelo::{Alta, Baja, EmpleadoRegistro, Legajo, Nomina};
use std::collections::{BTreeSet, HashSet};
use tracing::{info, warn};

/// De dónde salen los datos de un cambio organizativo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrigenCambio {
    /// Hoja de cambios organizativos (CO).
    HojaCambios,
    /// Fila de la nómina anterior, a falta de algo mejor.
    NominaAnterior,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CambioOrganizativo {
    pub registro: EmpleadoRegistro,
    pub origen: OrigenCambio,
}

/// Clasificación de una comparación entre dos nóminas.
#[derive(Debug, Clone, Default)]
pub struct Diferencias {
    pub altas: Vec<Alta>,
    pub continuan: Vec<EmpleadoRegistro>,
    pub bajas: Vec<Baja>,
    pub cambios_organizativos: Vec<CambioOrganizativo>,
    pub advertencias: Vec<Advertencia>,
}

/// Clasifica cada legajo entre ingresos, continuidades, bajas y cambios
/// organizativos.
///
/// * `anterior`: activos del corte previo.
/// * `actual`: consulta base completa (todos los estados).
/// * `cambios`: hoja CO, si existe.
///
/// Cada legajo activo de `anterior` termina en exactamente una de
/// `continuan`, `bajas` o `cambios_organizativos`. Las filas de `anterior`
/// con estado Baja no cuentan como activas.
pub fn comparar(anterior: &Nomina, actual: &Nomina, cambios: Option<&Nomina>) -> Diferencias {
    let previos: HashSet<&Legajo> = anterior
        .registros
        .iter()
        .filter(|r| !r.estado.es_baja())
        .map(|r| &r.legajo)
        .collect();
    let actuales: HashSet<&Legajo> = actual.legajos();

    let mut diferencias = Diferencias::default();

    for registro in &actual.registros {
        let estaba = previos.contains(&registro.legajo);
        if registro.estado.es_baja() {
            if estaba {
                if let Some(baja) = Baja::desde_registro(registro) {
                    diferencias.bajas.push(baja);
                }
            }
        } else if estaba {
            diferencias.continuan.push(registro.clone());
        } else if registro.estado.es_activo() {
            diferencias.altas.push(Alta::new(registro.clone()));
        }
    }

    // Legajos que estaban y ya no figuran en la consulta, en orden estable
    let desaparecidos: BTreeSet<&Legajo> = previos.difference(&actuales).copied().collect();

    let cambios = cambios.filter(|c| !c.is_empty());
    match cambios {
        Some(hoja) => {
            let mut sin_cubrir = Vec::new();
            for legajo in &desaparecidos {
                match hoja.buscar(legajo) {
                    Some(registro) => diferencias.cambios_organizativos.push(CambioOrganizativo {
                        registro: registro.clone(),
                        origen: OrigenCambio::HojaCambios,
                    }),
                    None => {
                        sin_cubrir.push((*legajo).clone());
                        if let Some(registro) = anterior.buscar(legajo) {
                            diferencias.cambios_organizativos.push(CambioOrganizativo {
                                registro: registro.clone(),
                                origen: OrigenCambio::NominaAnterior,
                            });
                        }
                    }
                }
            }
            if !sin_cubrir.is_empty() {
                warn!(
                    "{} legajos desaparecidos sin registro en la hoja '{}'",
                    sin_cubrir.len(),
                    hoja.hoja
                );
                diferencias.advertencias.push(Advertencia::LegajosSinCambio {
                    hoja: hoja.hoja.clone(),
                    legajos: sin_cubrir,
                });
            }
        }
        None => {
            for legajo in &desaparecidos {
                if let Some(registro) = anterior.buscar(legajo) {
                    diferencias.cambios_organizativos.push(CambioOrganizativo {
                        registro: registro.clone(),
                        origen: OrigenCambio::NominaAnterior,
                    });
                }
            }
        }
    }

    if previos.is_empty() {
        warn!("Nómina anterior vacía: todos los activos se informan como altas");
        diferencias.advertencias.push(Advertencia::SinNominaAnterior {
            hoja: anterior.hoja.clone(),
        });
    }

    info!(
        "Comparación: {} altas, {} continúan, {} bajas, {} cambios organizativos",
        diferencias.altas.len(),
        diferencias.continuan.len(),
        diferencias.bajas.len(),
        diferencias.cambios_organizativos.len()
    );

    diferencias
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modelo::EstadoOcupacion;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn fecha(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn nomina(hoja: &str, registros: Vec<EmpleadoRegistro>) -> Nomina {
        Nomina {
            hoja: hoja.to_string(),
            registros,
        }
    }

    fn activo(legajo: &str) -> EmpleadoRegistro {
        EmpleadoRegistro::new(Legajo::new(legajo))
    }

    fn baja(legajo: &str, desde: NaiveDate) -> EmpleadoRegistro {
        let mut r = activo(legajo);
        r.estado = EstadoOcupacion::Baja;
        r.desde = Some(desde);
        r
    }

    fn anterior_123() -> Nomina {
        nomina("Activos", vec![activo("1"), activo("2"), activo("3")])
    }

    fn actual_124() -> Nomina {
        let mut nuevo = activo("4");
        nuevo.fecha_ingreso = Some(fecha(2024, 2, 1));
        nomina(
            "Consulta Base",
            vec![activo("1"), baja("2", fecha(2024, 3, 10)), nuevo],
        )
    }

    fn legajos_de(registros: impl Iterator<Item = Legajo>) -> Vec<String> {
        registros.map(|l| l.0).collect()
    }

    #[test]
    fn ejemplo_basico_de_clasificacion() {
        let d = comparar(&anterior_123(), &actual_124(), None);

        assert_eq!(legajos_de(d.altas.iter().map(|a| a.registro.legajo.clone())), vec!["4"]);
        assert_eq!(legajos_de(d.continuan.iter().map(|r| r.legajo.clone())), vec!["1"]);
        assert_eq!(d.bajas.len(), 1);
        assert_eq!(d.bajas[0].registro.legajo, Legajo::new("2"));
        assert_eq!(d.bajas[0].fecha_egreso, Some(fecha(2024, 3, 9)));
        assert_eq!(d.cambios_organizativos.len(), 1);
        assert_eq!(d.cambios_organizativos[0].registro.legajo, Legajo::new("3"));
        assert_eq!(d.cambios_organizativos[0].origen, OrigenCambio::NominaAnterior);
    }

    #[test]
    fn hoja_de_cambios_reemplaza_datos_viejos_y_avisa_faltantes() {
        let anterior = nomina(
            "Activos",
            vec![activo("1"), activo("2"), activo("3"), activo("5")],
        );
        let mut traslado = activo("3");
        traslado.apellido_nombre = "Traslado a otra empresa".to_string();
        let co = nomina("CO", vec![traslado, activo("99")]);

        let d = comparar(&anterior, &actual_124(), Some(&co));

        assert_eq!(d.cambios_organizativos.len(), 2);
        let tres = &d.cambios_organizativos[0];
        assert_eq!(tres.registro.legajo, Legajo::new("3"));
        assert_eq!(tres.origen, OrigenCambio::HojaCambios);
        assert_eq!(tres.registro.apellido_nombre, "Traslado a otra empresa");
        assert_eq!(d.cambios_organizativos[1].origen, OrigenCambio::NominaAnterior);

        assert_eq!(
            d.advertencias,
            vec![Advertencia::LegajosSinCambio {
                hoja: "CO".to_string(),
                legajos: vec![Legajo::new("5")],
            }]
        );
    }

    #[test]
    fn hoja_de_cambios_vacia_usa_nomina_anterior() {
        let co = nomina("CO", vec![]);
        let d = comparar(&anterior_123(), &actual_124(), Some(&co));
        assert_eq!(d.cambios_organizativos[0].origen, OrigenCambio::NominaAnterior);
        assert!(d.advertencias.is_empty());
    }

    #[test]
    fn arranque_en_frio_todos_son_altas() {
        let vacia = nomina("Activos", vec![]);
        let d = comparar(&vacia, &actual_124(), None);
        assert_eq!(d.altas.len(), 2);
        assert!(d.bajas.is_empty());
        assert!(d.cambios_organizativos.is_empty());
        assert_eq!(
            d.advertencias,
            vec![Advertencia::SinNominaAnterior {
                hoja: "Activos".to_string(),
            }]
        );
    }

    #[test]
    fn bajas_de_la_nomina_anterior_no_se_repiten() {
        let anterior = nomina(
            "Activos",
            vec![activo("1"), baja("2", fecha(2024, 3, 10)), activo("3")],
        );
        let d = comparar(&anterior, &actual_124(), None);

        assert!(d.bajas.is_empty());
        assert_eq!(legajos_de(d.continuan.iter().map(|r| r.legajo.clone())), vec!["1"]);
        assert_eq!(d.cambios_organizativos.len(), 1);
        assert_eq!(d.cambios_organizativos[0].registro.legajo, Legajo::new("3"));
    }

    #[test]
    fn nomina_anterior_solo_con_bajas_es_arranque_en_frio() {
        let anterior = nomina("Activos", vec![baja("7", fecha(2024, 1, 5))]);
        let d = comparar(&anterior, &actual_124(), None);

        assert_eq!(d.altas.len(), 2);
        assert!(d.cambios_organizativos.is_empty());
        assert!(d
            .advertencias
            .iter()
            .any(|a| matches!(a, Advertencia::SinNominaAnterior { .. })));
    }

    #[test]
    fn bajas_antiguas_no_cuentan() {
        let anterior = nomina("Activos", vec![activo("1")]);
        let actual = nomina(
            "Consulta Base",
            vec![activo("1"), baja("8", fecha(2020, 1, 1))],
        );
        let d = comparar(&anterior, &actual, None);
        assert!(d.bajas.is_empty());
        assert!(d.altas.is_empty());
    }

    #[test]
    fn particion_sin_duplicados() {
        let anterior = nomina(
            "Activos",
            (1..=12).map(|i| activo(&i.to_string())).collect(),
        );
        let mut registros = Vec::new();
        for i in 1..=20 {
            let legajo = i.to_string();
            match i % 4 {
                0 => continue,
                1 => registros.push(baja(&legajo, fecha(2024, 5, 1))),
                2 => {
                    let mut r = activo(&legajo);
                    r.estado = EstadoOcupacion::Otro("Licencia".to_string());
                    registros.push(r);
                }
                _ => registros.push(activo(&legajo)),
            }
        }
        let actual = nomina("Consulta Base", registros);

        let d = comparar(&anterior, &actual, None);

        let mut vistos: HashMap<Legajo, usize> = HashMap::new();
        let todos = d
            .altas
            .iter()
            .map(|a| &a.registro.legajo)
            .chain(d.continuan.iter().map(|r| &r.legajo))
            .chain(d.bajas.iter().map(|b| &b.registro.legajo))
            .chain(d.cambios_organizativos.iter().map(|c| &c.registro.legajo));
        for legajo in todos {
            *vistos.entry(legajo.clone()).or_default() += 1;
        }
        assert!(vistos.values().all(|&n| n == 1));

        let mut esperados: HashSet<Legajo> =
            anterior.registros.iter().map(|r| r.legajo.clone()).collect();
        esperados.extend(
            actual
                .registros
                .iter()
                .filter(|r| r.estado.es_activo())
                .map(|r| r.legajo.clone()),
        );
        let obtenidos: HashSet<Legajo> = vistos.into_keys().collect();
        assert_eq!(obtenidos, esperados);

        for registro in &anterior.registros {
            let clases = [
                d.continuan.iter().any(|r| r.legajo == registro.legajo),
                d.bajas.iter().any(|b| b.registro.legajo == registro.legajo),
                d.cambios_organizativos
                    .iter()
                    .any(|c| c.registro.legajo == registro.legajo),
            ];
            assert_eq!(clases.iter().filter(|&&c| c).count(), 1);
        }
    }
}
