//! Name generation for seed patients

use rand::Rng;

/// Generate a random "Given Family" patient name
pub fn generate_name(rng: &mut impl Rng) -> String {
    let given = GIVEN_NAMES[rng.gen_range(0..GIVEN_NAMES.len())];
    let family = FAMILY_NAMES[rng.gen_range(0..FAMILY_NAMES.len())];
    format!("{given} {family}")
}

/// Pick one entry from a fixed list
pub fn pick<'a>(rng: &mut impl Rng, options: &[&'a str]) -> &'a str {
    options[rng.gen_range(0..options.len())]
}

static GIVEN_NAMES: &[&str] = &[
    "James",
    "Robert",
    "Michael",
    "William",
    "David",
    "Joseph",
    "Charles",
    "Thomas",
    "Mary",
    "Patricia",
    "Jennifer",
    "Linda",
    "Elizabeth",
    "Barbara",
    "Susan",
    "Dorothy",
    "Wei",
    "Aisha",
    "Carlos",
    "Fatima",
    "Kenji",
    "Olga",
    "Raj",
    "Elena",
    "Hassan",
    "Priya",
    "Ming",
    "Omar",
    "Diego",
    "Nadia",
    "Leila",
    "Ruth",
    "Harold",
    "Evelyn",
    "Walter",
    "Gloria",
];

static FAMILY_NAMES: &[&str] = &[
    "Smith",
    "Johnson",
    "Williams",
    "Brown",
    "Jones",
    "Miller",
    "Davis",
    "Wilson",
    "Taylor",
    "Anderson",
    "Jackson",
    "White",
    "Harris",
    "Martin",
    "Thompson",
    "Chen",
    "Patel",
    "Garcia",
    "Kim",
    "Okonkwo",
    "Nguyen",
    "Santos",
    "Singh",
    "Rodriguez",
    "Park",
    "Ahmed",
    "O'Brien",
    "De Silva",
    "Al-Rashid",
];
