//! Keyword categorization for sporting events.

pub const OTHER: (&str, &str) = ("Other", "General");

type Group = (&'static str, &'static [(&'static str, &'static [&'static str])]);

const KEYWORDS: &[Group] = &[
    (
        "Cycling",
        &[
            ("Sportives", &["sportive"]),
            ("Time Trials", &["time trial"]),
            ("Mountain Biking", &["mountain bike", "mtb"]),
            ("Cyclocross", &["cyclocross", "cyclo-cross"]),
            ("Charity & Challenge Rides", &["charity ride", "challenge ride"]),
        ],
    ),
    (
        "Swimming",
        &[
            ("Open Water Swims", &["open water", "sea swim", "lake swim", "river swim"]),
            ("Swim Runs", &["swimrun", "swim run", "swim-run"]),
        ],
    ),
    (
        "Functional Fitness",
        &[
            ("Hyrox / DEKA FIT", &["hyrox", "deka"]),
            ("CrossFit Competitions", &["crossfit"]),
        ],
    ),
    (
        "Multi-Discipline",
        &[
            ("Triathlon", &["triathlon"]),
            ("Duathlon", &["duathlon"]),
            ("Aquathlon", &["aquathlon"]),
        ],
    ),
    (
        "Running",
        &[
            (
                "Road running",
                &[
                    "5k", "5km", "10k", "10km", "half marathon", "half-marathon", "marathon",
                    "ultra",
                ],
            ),
            ("Trail running", &["trail run", "trail race", "fell run", "off road"]),
            ("Park runs", &["parkrun", "park run"]),
            ("Charity runs", &["charity run", "fundraising run"]),
            ("Fun runs", &["fun run", "colour run", "color run"]),
            ("Obstacle courses", &["obstacle course", "obstacle race", "mud run"]),
        ],
    ),
];

/// First matching `(category, subcategory)` in table order, or [`OTHER`].
///
/// Keywords match as substrings. Running comes last so that a triathlon
/// mentioning its 10k leg is still a triathlon.
pub fn by_keywords(title: &str, description: Option<&str>) -> (&'static str, &'static str) {
    let mut text = title.to_lowercase();
    if let Some(description) = description {
        text.push(' ');
        text.push_str(&description.to_lowercase());
    }
    for (category, subcategories) in KEYWORDS.iter() {
        for (subcategory, keywords) in subcategories.iter() {
            if keywords.iter().any(|keyword| text.contains(keyword)) {
                return (*category, *subcategory);
            }
        }
    }
    OTHER
}
