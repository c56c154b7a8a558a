//! Field tables shared by the prompt templates and the dispatch checks.

/// One numeric field of the transmission design input form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    /// Label as printed on the (Vietnamese) paper form.
    pub printed: &'static str,
}

/// The 15 fields read from a scanned design form, in canonical order.
pub const FORM_FIELDS: [FormField; 15] = [
    FormField {
        key: "F",
        label: "Conveyor belt pulling force (N)",
        printed: "Lực vòng băng tải (N)",
    },
    FormField {
        key: "v",
        label: "Conveyor belt speed (m/s)",
        printed: "Vận tốc băng tải (m/s)",
    },
    FormField {
        key: "D",
        label: "Drive drum diameter (mm)",
        printed: "Đường kính tang dẫn (mm)",
    },
    FormField {
        key: "L",
        label: "Service life (years)",
        printed: "Thời gian phục vụ (năm)",
    },
    FormField {
        key: "t1",
        label: "Duration t1 (s)",
        printed: "Thời gian t1 (s)",
    },
    FormField {
        key: "t2",
        label: "Duration t2 (s)",
        printed: "Thời gian t2 (s)",
    },
    FormField {
        key: "T1",
        label: "Load period T1 (s)",
        printed: "Thời gian T1 (s)",
    },
    FormField {
        key: "T2",
        label: "Load period T2 (s)",
        printed: "Thời gian T2 (s)",
    },
    FormField {
        key: "nol",
        label: "Rolling bearing efficiency",
        printed: "Hiệu suất Ổ lăn",
    },
    FormField {
        key: "nbr",
        label: "Gear pair efficiency",
        printed: "Hiệu suất Bánh răng",
    },
    FormField {
        key: "nx",
        label: "Chain drive efficiency",
        printed: "Hiệu suất Xích",
    },
    FormField {
        key: "uh",
        label: "Gearbox transmission ratio",
        printed: "Hệ số Truyền động hộp",
    },
    FormField {
        key: "u1",
        label: "High-speed stage transmission ratio",
        printed: "Hệ số Truyền cấp nhanh",
    },
    FormField {
        key: "u2",
        label: "Low-speed stage transmission ratio",
        printed: "Hệ số Truyền cấp chậm",
    },
    FormField {
        key: "ux",
        label: "Chain drive transmission ratio",
        printed: "Hệ số Truyền xích",
    },
];

pub const MATERIAL_NAME: &str = "vat_lieu";
pub const HEAT_TREATMENT: &str = "nhiet_luyen";
pub const SURFACE_HARDNESS: &str = "do_ran_be_mat";
pub const RATIONALE: &str = "giai_thich";

/// Keys of a material selection answer.
pub const MATERIAL_FIELDS: [&str; 4] = [MATERIAL_NAME, HEAT_TREATMENT, SURFACE_HARDNESS, RATIONALE];

/// Motor ranking rules, the single source for the motor prompt.
pub const MOTOR_CRITERIA: &str = "\
1. Power (`power`, kW) must be greater than or equal to the required power.\n\
2. Rotational speed (`speed`, RPM) should be the closest value that is greater than or \
equal to the required speed.";

/// Material rules; the material table itself only exists in the attached image.
pub const MATERIAL_CRITERIA: &str = "\
1. The contact stress must fall **within** the contact stress range listed in the table.\n\
2. Take the gear tooth count and the chain speed into account.";

/// Every form key, in canonical order.
pub fn form_keys() -> impl Iterator<Item = &'static str> {
    FORM_FIELDS.iter().map(|f| f.key)
}
