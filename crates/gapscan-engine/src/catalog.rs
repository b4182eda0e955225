use gapscan_core::GapPriority;

/// One entry of the critical-attribute catalog: a data field considered
/// necessary for a migration-strategy decision, with the asset field paths
/// it may live under.
#[derive(Debug, Clone, Copy)]
pub struct CriticalAttribute {
    pub name: &'static str,
    pub required: bool,
    pub field_paths: &'static [&'static str],
    pub priority: GapPriority,
    pub category: &'static str,
}

/// The fixed catalog, loaded once per process. Required attributes carry
/// critical/high priority, optional ones medium/low.
pub const CATALOG: &[CriticalAttribute] = &[
    CriticalAttribute {
        name: "os",
        required: true,
        field_paths: &["os", "operating_system", "custom_attributes.os"],
        priority: GapPriority::Critical,
        category: "infrastructure",
    },
    CriticalAttribute {
        name: "os_version",
        required: true,
        field_paths: &["os_version", "custom_attributes.os_version"],
        priority: GapPriority::High,
        category: "infrastructure",
    },
    CriticalAttribute {
        name: "cpu_cores",
        required: true,
        field_paths: &["cpu_cores", "vcpus", "custom_attributes.cpu_cores"],
        priority: GapPriority::High,
        category: "capacity",
    },
    CriticalAttribute {
        name: "memory_gb",
        required: true,
        field_paths: &["memory_gb", "ram_gb", "custom_attributes.memory_gb"],
        priority: GapPriority::High,
        category: "capacity",
    },
    CriticalAttribute {
        name: "storage_gb",
        required: true,
        field_paths: &["storage_gb", "disk_gb", "custom_attributes.storage_gb"],
        priority: GapPriority::High,
        category: "capacity",
    },
    CriticalAttribute {
        name: "technology_stack",
        required: true,
        field_paths: &["technology_stack", "tech_stack", "custom_attributes.technology_stack"],
        priority: GapPriority::Critical,
        category: "application",
    },
    CriticalAttribute {
        name: "application_type",
        required: true,
        field_paths: &["application_type", "custom_attributes.application_type"],
        priority: GapPriority::Critical,
        category: "application",
    },
    CriticalAttribute {
        name: "database_engine",
        required: true,
        field_paths: &["database_engine", "db_engine", "custom_attributes.database_engine"],
        priority: GapPriority::High,
        category: "application",
    },
    CriticalAttribute {
        name: "middleware",
        required: false,
        field_paths: &["middleware", "custom_attributes.middleware"],
        priority: GapPriority::Medium,
        category: "application",
    },
    CriticalAttribute {
        name: "network_zone",
        required: true,
        field_paths: &["network_zone", "custom_attributes.network_zone"],
        priority: GapPriority::High,
        category: "network",
    },
    CriticalAttribute {
        name: "ip_address",
        required: false,
        field_paths: &["ip_address", "custom_attributes.ip_address"],
        priority: GapPriority::Medium,
        category: "network",
    },
    CriticalAttribute {
        name: "environment",
        required: true,
        field_paths: &["environment", "env", "custom_attributes.environment"],
        priority: GapPriority::Critical,
        category: "governance",
    },
    CriticalAttribute {
        name: "business_criticality",
        required: true,
        field_paths: &["business_criticality", "custom_attributes.business_criticality"],
        priority: GapPriority::Critical,
        category: "business",
    },
    CriticalAttribute {
        name: "business_owner",
        required: false,
        field_paths: &["business_owner", "owner", "custom_attributes.business_owner"],
        priority: GapPriority::Medium,
        category: "business",
    },
    CriticalAttribute {
        name: "compliance_scope",
        required: true,
        field_paths: &["compliance_scope", "custom_attributes.compliance_scope"],
        priority: GapPriority::High,
        category: "governance",
    },
    CriticalAttribute {
        name: "rpo_minutes",
        required: true,
        field_paths: &["rpo_minutes", "custom_attributes.rpo_minutes"],
        priority: GapPriority::High,
        category: "resilience",
    },
    CriticalAttribute {
        name: "rto_minutes",
        required: true,
        field_paths: &["rto_minutes", "custom_attributes.rto_minutes"],
        priority: GapPriority::High,
        category: "resilience",
    },
    CriticalAttribute {
        name: "dependencies",
        required: true,
        field_paths: &["dependencies", "depends_on", "custom_attributes.dependencies"],
        priority: GapPriority::Critical,
        category: "application",
    },
    CriticalAttribute {
        name: "license_model",
        required: false,
        field_paths: &["license_model", "licensing", "custom_attributes.license_model"],
        priority: GapPriority::Medium,
        category: "business",
    },
    CriticalAttribute {
        name: "hosting_model",
        required: true,
        field_paths: &["hosting_model", "custom_attributes.hosting_model"],
        priority: GapPriority::High,
        category: "infrastructure",
    },
    CriticalAttribute {
        name: "utilization_profile",
        required: false,
        field_paths: &["utilization_profile", "custom_attributes.utilization_profile"],
        priority: GapPriority::Low,
        category: "capacity",
    },
    CriticalAttribute {
        name: "eol_status",
        required: false,
        field_paths: &["eol_status", "end_of_life", "custom_attributes.eol_status"],
        priority: GapPriority::Medium,
        category: "governance",
    },
];

pub fn find(name: &str) -> Option<&'static CriticalAttribute> {
    CATALOG.iter().find(|a| a.name == name)
}
