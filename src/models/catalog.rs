//! Place catalog: which places get an emblem and how each is looked up.
//!
//! The catalog is plain configuration data. It is built once and handed to the
//! batch driver; nothing reads it from global state.

use std::collections::BTreeMap;

/// Metropolitan departments (96)
const DEPARTMENTS: &[&str] = &[
    "Ain", "Aisne", "Allier", "Alpes-de-Haute-Provence", "Hautes-Alpes",
    "Alpes-Maritimes", "Ardèche", "Ardennes", "Ariège", "Aube", "Aude",
    "Aveyron", "Bouches-du-Rhône", "Calvados", "Cantal", "Charente",
    "Charente-Maritime", "Cher", "Corrèze", "Corse-du-Sud", "Haute-Corse",
    "Côte-d'Or", "Côtes-d'Armor", "Creuse", "Dordogne", "Doubs", "Drôme",
    "Eure", "Eure-et-Loir", "Finistère", "Gard", "Haute-Garonne", "Gers",
    "Gironde", "Hérault", "Ille-et-Vilaine", "Indre", "Indre-et-Loire",
    "Isère", "Jura", "Landes", "Loir-et-Cher", "Loire", "Haute-Loire",
    "Loire-Atlantique", "Loiret", "Lot", "Lot-et-Garonne", "Lozère",
    "Maine-et-Loire", "Manche", "Marne", "Haute-Marne", "Mayenne",
    "Meurthe-et-Moselle", "Meuse", "Morbihan", "Moselle", "Nièvre", "Nord",
    "Oise", "Orne", "Pas-de-Calais", "Puy-de-Dôme", "Pyrénées-Atlantiques",
    "Hautes-Pyrénées", "Pyrénées-Orientales", "Bas-Rhin", "Haut-Rhin",
    "Rhône", "Haute-Saône", "Saône-et-Loire", "Sarthe", "Savoie",
    "Haute-Savoie", "Paris", "Seine-Maritime", "Seine-et-Marne",
    "Yvelines", "Deux-Sèvres", "Somme", "Tarn", "Tarn-et-Garonne", "Var",
    "Vaucluse", "Vendée", "Vienne", "Haute-Vienne", "Vosges", "Yonne",
    "Territoire de Belfort", "Essonne", "Hauts-de-Seine", "Seine-Saint-Denis",
    "Val-de-Marne", "Val-d'Oise",
];

/// Metropolitan regions (13), as geocoder queries
const REGIONS: &[&str] = &[
    "Auvergne-Rhône-Alpes", "Bourgogne-Franche-Comté", "Bretagne, France",
    "Centre-Val de Loire", "Corse", "Grand Est", "Hauts-de-France",
    "Île-de-France", "Normandie", "Nouvelle-Aquitaine", "Occitanie",
    "Pays de la Loire", "Provence-Alpes-Côte d'Azur",
];

/// Overseas departments and collectivities
const OVERSEAS: &[&str] = &[
    "Guadeloupe", "Martinique", "Guyane", "La Réunion", "Mayotte",
    "Saint-Pierre-et-Miquelon", "Saint-Barthélemy", "Saint-Martin",
    "Wallis-et-Futuna", "Polynésie française", "Nouvelle-Calédonie",
];

/// Names whose plain "<name>, France" query resolves to the wrong object
const QUERY_OVERRIDES: &[(&str, &str)] = &[
    ("La Réunion", "Île de La Réunion"),
    ("Martinique", "Île de la Martinique"),
    ("Guadeloupe", "Guadeloupe, France"),
    ("Guyane", "Guyane française"),
    ("Mayotte", "Mayotte, France"),
    ("Saint-Pierre-et-Miquelon", "Saint-Pierre-et-Miquelon"),
    ("Saint-Barthélemy", "Saint-Barthélemy, France"),
    ("Saint-Martin", "Saint-Martin (partie française)"),
    ("Wallis-et-Futuna", "Wallis-et-Futuna"),
    ("Polynésie française", "Polynésie française"),
    ("Nouvelle-Calédonie", "Nouvelle-Calédonie"),
    (
        "Terres australes et antarctiques françaises",
        "Terres australes et antarctiques françaises",
    ),
    ("Clipperton", "Île de Clipperton"),
];

/// The aggregate entity rebuilt from the union of its regions, once with and
/// once without one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub name: String,
    pub excluded_region: String,
    pub with_suffix: String,
    pub without_suffix: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub departments: Vec<String>,
    pub regions: Vec<String>,
    pub overseas: Vec<String>,
    pub query_overrides: BTreeMap<String, String>,
    /// Names queried verbatim, without the country suffix
    pub unsuffixed: Vec<String>,
    pub country_suffix: String,
    pub aggregate: Aggregate,
}

impl Catalog {
    /// Catalog of French departments, regions and overseas territories
    pub fn france() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            departments: owned(DEPARTMENTS),
            regions: owned(REGIONS),
            overseas: owned(OVERSEAS),
            query_overrides: QUERY_OVERRIDES
                .iter()
                .map(|(name, query)| (name.to_string(), query.to_string()))
                .collect(),
            unsuffixed: owned(&["France", "France métropolitaine"]),
            country_suffix: ", France".to_string(),
            aggregate: Aggregate {
                name: "France".to_string(),
                excluded_region: "Corse".to_string(),
                with_suffix: "_avec_corse".to_string(),
                without_suffix: "_sans_corse".to_string(),
            },
        }
    }

    /// Geocoder query for a place name
    pub fn query_for(&self, name: &str) -> String {
        if let Some(query) = self.query_overrides.get(name) {
            return query.clone();
        }
        if self.unsuffixed.iter().any(|n| n == name) {
            return name.to_string();
        }
        format!("{}{}", name, self.country_suffix)
    }

    /// Places processed one by one: departments first, then overseas territories
    pub fn places(&self) -> impl Iterator<Item = &str> {
        self.departments
            .iter()
            .chain(self.overseas.iter())
            .map(String::as_str)
    }

    /// Whether a region is left out of the aggregate's reduced variant
    pub fn is_excluded_region(&self, region: &str) -> bool {
        region == self.aggregate.excluded_region
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::france()
    }
}
