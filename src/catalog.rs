pub const TV_MOUNTING: &str = "tv-mounting";
pub const SMART_INSTALL: &str = "smart-install";
pub const FURNITURE_ASSEMBLY: &str = "furniture-assembly";

#[derive(Clone, Copy, Debug)]
pub struct Service {
    pub slug: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub base_price: i64,
    pub unit: &'static str,
    pub pricing_note: Option<&'static str>,
}

const SERVICES: &[Service] = &[
    Service {
        slug: TV_MOUNTING,
        title: "TV Mounting Service",
        description: "Professional TV mounting service for all TV sizes. Includes wall mounting, cable management, and basic setup. We handle everything from finding the perfect spot to ensuring your TV is securely mounted and properly connected.",
        base_price: 69,
        unit: "/TV",
        pricing_note: Some("Starting at $69 for TVs under 40\". Additional charges for larger TVs, wire management, and lifting help."),
    },
    Service {
        slug: SMART_INSTALL,
        title: "Smart Home Installation",
        description: "Expert installation and setup of smart home devices. From smart speakers and displays to security cameras and doorbells, we'll get your devices connected and configured for optimal performance. Includes device setup, network configuration, and app installation.",
        base_price: 69,
        unit: "/device",
        pricing_note: Some("First device: $69, Additional devices: $39 each. Network setup available for $50."),
    },
    Service {
        slug: FURNITURE_ASSEMBLY,
        title: "Furniture Assembly",
        description: "Professional furniture assembly service for all types of furniture. We'll carefully assemble your furniture according to manufacturer specifications, ensuring everything is sturdy and properly put together. Includes assembly, placement, and cleanup.",
        base_price: 69,
        unit: "/item",
        pricing_note: Some("Small jobs: $69, Medium jobs: $89, Large jobs: $119. Additional items charged at the same rate."),
    },
];

pub fn services() -> &'static [Service] {
    SERVICES
}

pub fn find(slug: &str) -> Option<&'static Service> {
    SERVICES.iter().find(|service| service.slug == slug)
}

/// Bullet points for the "What's Included" section of a service detail page.
pub fn included_items(slug: &str) -> &'static [&'static str] {
    match slug {
        TV_MOUNTING => &[
            "Professional wall mounting",
            "Finding the perfect viewing height",
            "Basic cable management",
            "Clean up after installation",
            "100% satisfaction guarantee",
        ],
        SMART_INSTALL => &[
            "Professional device installation",
            "Network assessment",
            "Device setup",
            "Clean up after installation",
            "100% satisfaction guarantee",
        ],
        FURNITURE_ASSEMBLY => &[
            "Professional furniture assembly",
            "Assembly according to specifications",
            "Quality check",
            "Clean up of packaging",
            "100% satisfaction guarantee",
        ],
        _ => &[
            "Professional service",
            "Quality workmanship",
            "Clean up after service",
            "100% satisfaction guarantee",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_three_services() {
        let slugs: Vec<&str> = services().iter().map(|s| s.slug).collect();
        assert_eq!(slugs, vec![TV_MOUNTING, SMART_INSTALL, FURNITURE_ASSEMBLY]);
    }

    #[test]
    fn find_matches_by_slug() {
        let service = find("smart-install").unwrap();
        assert_eq!(service.title, "Smart Home Installation");
        assert_eq!(service.base_price, 69);
        assert!(find("window-cleaning").is_none());
    }
}
