use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::{self, Service, FURNITURE_ASSEMBLY, SMART_INSTALL, TV_MOUNTING};

macro_rules! option_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }
    };
}

option_enum!(TvSizeRange {
    Under40 => "under-40",
    From41To55 => "41-55",
    From56To70 => "56-70",
    Over70 => "over-70",
});

option_enum!(WireManagement {
    None => "none",
    InWall => "in-wall",
    External => "external",
});

option_enum!(LiftingHelp {
    Yes => "yes",
    No => "no",
});

option_enum!(WallMountType {
    None => "none",
    Fixed => "fixed",
    FullMotion => "full-motion",
});

option_enum!(DeviceType {
    Camera => "camera",
    Speaker => "speaker",
    Display => "display",
    Doorbell => "doorbell",
    Other => "other",
});

option_enum!(NetworkSetup {
    None => "none",
    Basic => "basic",
});

option_enum!(MountingType {
    None => "none",
    Wall => "wall",
    Ceiling => "ceiling",
});

option_enum!(JobSize {
    Small => "small",
    Medium => "medium",
    Large => "large",
});

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TvMountingDetails {
    pub tv_size_range: TvSizeRange,
    #[serde(rename = "exactTVSize", default, skip_serializing_if = "Option::is_none")]
    pub exact_tv_size: Option<u32>,
    pub wire_management: WireManagement,
    pub lifting_help: LiftingHelp,
    pub wall_mount_type: WallMountType,
}

impl Default for TvMountingDetails {
    fn default() -> Self {
        Self {
            tv_size_range: TvSizeRange::Under40,
            exact_tv_size: None,
            wire_management: WireManagement::None,
            lifting_help: LiftingHelp::Yes,
            wall_mount_type: WallMountType::None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartHomeDetails {
    pub device_type: DeviceType,
    pub device_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_brand: Option<String>,
    pub network_setup: NetworkSetup,
    pub mounting_type: MountingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_devices: Option<String>,
}

impl Default for SmartHomeDetails {
    fn default() -> Self {
        Self {
            device_type: DeviceType::Speaker,
            device_count: 1,
            device_brand: None,
            network_setup: NetworkSetup::None,
            mounting_type: MountingType::None,
            additional_devices: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FurnitureAssemblyDetails {
    pub job_size: JobSize,
    pub item_count: u32,
    pub item_description: String,
}

impl Default for FurnitureAssemblyDetails {
    fn default() -> Self {
        Self {
            job_size: JobSize::Small,
            item_count: 1,
            item_description: String::new(),
        }
    }
}

/// The service-specific question set. Modelled as a tagged union so only one
/// shape can ever be stored: switching services cannot leave stale options
/// from the previous service behind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ServiceOptions {
    #[default]
    Unset,
    TvMounting(TvMountingDetails),
    SmartHome(SmartHomeDetails),
    FurnitureAssembly(FurnitureAssemblyDetails),
}

impl ServiceOptions {
    pub fn tv(&self) -> Option<&TvMountingDetails> {
        match self {
            ServiceOptions::TvMounting(details) => Some(details),
            _ => None,
        }
    }

    pub fn smart_home(&self) -> Option<&SmartHomeDetails> {
        match self {
            ServiceOptions::SmartHome(details) => Some(details),
            _ => None,
        }
    }

    pub fn furniture(&self) -> Option<&FurnitureAssemblyDetails> {
        match self {
            ServiceOptions::FurnitureAssembly(details) => Some(details),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ContactInfo {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Name is required.".to_string());
        }
        if !looks_like_email(self.email.trim()) {
            errors.push("Invalid email address.".to_string());
        }
        if self.phone.chars().filter(|c| c.is_ascii_digit()).count() < 10 {
            errors.push("Phone number must be at least 10 digits.".to_string());
        }
        if self.address.trim().len() < 5 {
            errors.push("Address is required.".to_string());
        }
        errors
    }
}

fn looks_like_email(value: &str) -> bool {
    if value.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// The in-progress booking owned by a single session. All mutation happens
/// through explicit setters; the total is derived on every read.
#[derive(Clone, Debug, Default)]
pub struct BookingState {
    service_slug: Option<String>,
    date: Option<NaiveDate>,
    time_slot: Option<String>,
    contact_info: Option<ContactInfo>,
    options: ServiceOptions,
    package_option: Option<String>,
}

impl BookingState {
    pub fn select_service(&mut self, slug: &str) {
        if self.service_slug.as_deref() != Some(slug) {
            self.options = ServiceOptions::Unset;
        }
        self.service_slug = Some(slug.to_string());
    }

    /// Records the appointment; both fields always move together.
    pub fn set_date_time(&mut self, date: NaiveDate, time_slot: &str) {
        self.date = Some(date);
        self.time_slot = Some(time_slot.to_string());
    }

    pub fn set_contact_info(&mut self, info: ContactInfo) {
        self.contact_info = Some(info);
    }

    pub fn set_package_option(&mut self, tag: Option<String>) {
        self.package_option = tag;
    }

    pub fn set_tv_mounting_details(&mut self, details: Option<TvMountingDetails>) {
        self.options = match details {
            Some(details) => ServiceOptions::TvMounting(details),
            None => ServiceOptions::Unset,
        };
    }

    pub fn set_smart_home_details(&mut self, details: Option<SmartHomeDetails>) {
        self.options = match details {
            Some(details) => ServiceOptions::SmartHome(details),
            None => ServiceOptions::Unset,
        };
    }

    pub fn set_furniture_assembly_details(&mut self, details: Option<FurnitureAssemblyDetails>) {
        self.options = match details {
            Some(details) => ServiceOptions::FurnitureAssembly(details),
            None => ServiceOptions::Unset,
        };
    }

    /// Partial update; the closure sees the stored details or the defaults,
    /// so field-at-a-time edits never start from an undefined value.
    pub fn update_tv_mounting_details<F>(&mut self, update: F)
    where
        F: FnOnce(TvMountingDetails) -> TvMountingDetails,
    {
        let prev = self.options.tv().cloned().unwrap_or_default();
        self.options = ServiceOptions::TvMounting(update(prev));
    }

    pub fn update_smart_home_details<F>(&mut self, update: F)
    where
        F: FnOnce(SmartHomeDetails) -> SmartHomeDetails,
    {
        let prev = self.options.smart_home().cloned().unwrap_or_default();
        self.options = ServiceOptions::SmartHome(update(prev));
    }

    pub fn update_furniture_assembly_details<F>(&mut self, update: F)
    where
        F: FnOnce(FurnitureAssemblyDetails) -> FurnitureAssemblyDetails,
    {
        let prev = self.options.furniture().cloned().unwrap_or_default();
        self.options = ServiceOptions::FurnitureAssembly(update(prev));
    }

    pub fn reset(&mut self) {
        *self = BookingState::default();
    }

    pub fn service_slug(&self) -> Option<&str> {
        self.service_slug.as_deref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn time_slot(&self) -> Option<&str> {
        self.time_slot.as_deref()
    }

    pub fn contact_info(&self) -> Option<&ContactInfo> {
        self.contact_info.as_ref()
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    pub fn package_option(&self) -> Option<&str> {
        self.package_option.as_deref()
    }

    pub fn selected_service(&self) -> Option<&'static Service> {
        self.service_slug.as_deref().and_then(catalog::find)
    }

    /// Derived total in whole currency units. Falls back to the service base
    /// price when the options variant is absent or does not match the slug,
    /// and to zero when no service is selected.
    pub fn total(&self) -> i64 {
        let Some(service) = self.selected_service() else {
            return 0;
        };

        match (service.slug, &self.options) {
            (TV_MOUNTING, ServiceOptions::TvMounting(details)) => {
                tv_base_price(details.tv_size_range)
                    + wall_mount_surcharge(details.wall_mount_type, details.tv_size_range)
                    + wire_management_surcharge(details.wire_management)
                    + lifting_surcharge(details.lifting_help)
            }
            (SMART_INSTALL, ServiceOptions::SmartHome(details)) => smart_home_price(details),
            (FURNITURE_ASSEMBLY, ServiceOptions::FurnitureAssembly(details)) => {
                furniture_price(details)
            }
            _ => service.base_price,
        }
    }
}

pub fn tv_base_price(size: TvSizeRange) -> i64 {
    match size {
        TvSizeRange::Under40 => 69,
        TvSizeRange::From41To55 => 79,
        TvSizeRange::From56To70 => 99,
        TvSizeRange::Over70 => 149,
    }
}

pub fn wall_mount_surcharge(mount: WallMountType, size: TvSizeRange) -> i64 {
    match mount {
        WallMountType::None => 0,
        WallMountType::Fixed => match size {
            TvSizeRange::Under40 => 50,
            TvSizeRange::From41To55 => 60,
            TvSizeRange::From56To70 => 70,
            TvSizeRange::Over70 => 90,
        },
        WallMountType::FullMotion => match size {
            TvSizeRange::Under40 => 70,
            TvSizeRange::From41To55 => 80,
            TvSizeRange::From56To70 => 90,
            TvSizeRange::Over70 => 120,
        },
    }
}

pub fn wire_management_surcharge(wire: WireManagement) -> i64 {
    match wire {
        WireManagement::None => 0,
        WireManagement::InWall => 150,
        WireManagement::External => 50,
    }
}

pub fn lifting_surcharge(lifting: LiftingHelp) -> i64 {
    match lifting {
        LiftingHelp::Yes => 0,
        LiftingHelp::No => 40,
    }
}

pub fn smart_home_price(details: &SmartHomeDetails) -> i64 {
    let extra_devices = i64::from(details.device_count.saturating_sub(1));
    let mut total = 69 + 39 * extra_devices;
    if details.network_setup == NetworkSetup::Basic {
        total += 50;
    }
    total
}

pub fn furniture_base_price(size: JobSize) -> i64 {
    match size {
        JobSize::Small => 69,
        JobSize::Medium => 89,
        JobSize::Large => 119,
    }
}

pub fn furniture_price(details: &FurnitureAssemblyDetails) -> i64 {
    furniture_base_price(details.job_size) * i64::from(details.item_count.max(1))
}
