use std::collections::HashMap;

/// Logical roster fields, each reachable through several header spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RosterField {
    ProgramCode,
    SecondaryProgramCode,
    Identification,
    Email,
    FirstNames,
    LastNames,
    Gender,
    Mobile,
    Campus,
    Period,
    PracticeType,
}

/// Header synonyms in priority order, already in normalized form.
const CATALOG: &[(RosterField, &[&str])] = &[
    (
        RosterField::ProgramCode,
        &["codigo_programa", "cod_programa", "programa", "program_code"],
    ),
    (
        RosterField::SecondaryProgramCode,
        &[
            "codigo_programa_2",
            "cod_programa_2",
            "programa_2",
            "codigo_plan",
            "cod_plan",
            "plan",
            "secondary_program_code",
        ],
    ),
    (
        RosterField::Identification,
        &[
            "identificacion",
            "numero_identificacion",
            "numero_documento",
            "documento",
            "cedula",
            "identification",
        ],
    ),
    (
        RosterField::Email,
        &[
            "correo_institucional",
            "email_institucional",
            "correo",
            "email",
            "e_mail",
            "mail",
        ],
    ),
    (
        RosterField::FirstNames,
        &["nombres", "nombre", "first_names", "first_name"],
    ),
    (
        RosterField::LastNames,
        &["apellidos", "apellido", "last_names", "last_name"],
    ),
    (RosterField::Gender, &["genero", "sexo", "gender"]),
    (
        RosterField::Mobile,
        &["celular", "movil", "telefono_movil", "telefono", "mobile"],
    ),
    (RosterField::Campus, &["sede", "campus"]),
    (
        RosterField::Period,
        &["periodo", "periodo_academico", "period"],
    ),
    (
        RosterField::PracticeType,
        &[
            "tipo_practica",
            "tipo_de_practica",
            "modalidad",
            "practice_type",
        ],
    ),
];

/// Column positions resolved from the header row.
#[derive(Debug, Default)]
pub(crate) struct ColumnMap {
    positions: HashMap<RosterField, usize>,
}

impl ColumnMap {
    pub(crate) fn from_header(header: &[String]) -> Self {
        let normalized: Vec<String> = header.iter().map(|name| normalize_header(name)).collect();
        let mut positions = HashMap::new();

        for (field, synonyms) in CATALOG {
            let found = synonyms
                .iter()
                .find_map(|synonym| normalized.iter().position(|name| name == synonym));
            if let Some(index) = found {
                positions.insert(*field, index);
            }
        }

        Self { positions }
    }

    pub(crate) fn has(&self, field: RosterField) -> bool {
        self.positions.contains_key(&field)
    }

    /// Trimmed, non-empty value of `field` in `row`.
    pub(crate) fn get<'a>(&self, field: RosterField, row: &'a [String]) -> Option<&'a str> {
        self.positions
            .get(&field)
            .and_then(|index| row.get(*index))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

pub(crate) fn normalize_header(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let folded: String = cleaned
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            ' ' | '-' | '.' | '/' => '_',
            other => other,
        })
        .collect();

    folded
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
