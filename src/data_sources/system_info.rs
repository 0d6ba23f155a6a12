use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sysinfo::{Disks, System};

use crate::context::Context;
use crate::provider::{DataSource, ProviderError, Response};
use crate::schema::{Attribute, AttributeType, Schema};

pub struct SystemInfoDataSource;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
struct SystemInfoModel {
    hostname: String,
    os: String,
    platform_info: PlatformInfo,
    num_cpus: i64,
    memory_total: i64,
    disk_info: DiskInfo,
    proc_info: ProcInfo,
    home: String,
    path: String,
    working_dir: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
struct PlatformInfo {
    platform: String,
    platform_family: String,
    platform_version: String,
    kernel_version: String,
    kernel_arch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
struct DiskInfo {
    total: i64,
    used: i64,
    free: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
struct ProcInfo {
    uid: i64,
    gid: i64,
    pid: i64,
    ppid: i64,
}

#[async_trait]
impl DataSource for SystemInfoDataSource {
    fn type_name(&self) -> &'static str {
        "system_info"
    }

    fn schema(&self) -> Schema {
        let computed_string =
            |name: &'static str| Attribute::computed(name, AttributeType::String, "");
        let computed_int =
            |name: &'static str| Attribute::computed(name, AttributeType::Int64, "");

        Schema::new(
            "System information data source",
            vec![
                Attribute::computed("hostname", AttributeType::String, "Hostname of the system"),
                Attribute::computed("os", AttributeType::String, "Operating system name"),
                Attribute::computed(
                    "platform_info",
                    AttributeType::Object,
                    "Platform information including platform, family, version, kernel version, and architecture",
                )
                .nested(vec![
                    computed_string("platform"),
                    computed_string("platform_family"),
                    computed_string("platform_version"),
                    computed_string("kernel_version"),
                    computed_string("kernel_arch"),
                ]),
                Attribute::computed(
                    "proc_info",
                    AttributeType::Object,
                    "Process information including UID, GID, PID, and PPID",
                )
                .nested(vec![
                    computed_int("uid"),
                    computed_int("gid"),
                    computed_int("pid"),
                    computed_int("ppid"),
                ]),
                Attribute::computed(
                    "num_cpus",
                    AttributeType::Int64,
                    "Number of CPU cores available on the system",
                ),
                Attribute::computed(
                    "memory_total",
                    AttributeType::Int64,
                    "Total memory available on the system in bytes",
                ),
                Attribute::computed(
                    "disk_info",
                    AttributeType::Object,
                    "Disk information including total, used, and free space",
                )
                .nested(vec![
                    Attribute::computed("total", AttributeType::Int64, "Total disk space in bytes"),
                    Attribute::computed("used", AttributeType::Int64, "Used disk space in bytes"),
                    Attribute::computed("free", AttributeType::Int64, "Free disk space in bytes"),
                ]),
                Attribute::computed(
                    "home",
                    AttributeType::String,
                    "Home directory of the current user",
                ),
                Attribute::computed(
                    "path",
                    AttributeType::String,
                    "Value of the PATH environment variable",
                ),
                Attribute::computed(
                    "working_dir",
                    AttributeType::String,
                    "Current working directory of the process",
                ),
            ],
        )
    }

    async fn read(&self, _ctx: &Context, _config: Value) -> Result<Response, ProviderError> {
        let data = tokio::task::spawn_blocking(collect)
            .await
            .map_err(|e| ProviderError::diagnostic("Unable to get system info", e.to_string()))??;

        tracing::info!(
            hostname = %data.hostname,
            num_cpus = data.num_cpus,
            memory_total = data.memory_total,
            "collected system information"
        );

        Response::from_model(&data)
    }
}

fn search_path(raw: Result<String, std::env::VarError>) -> Result<String, ProviderError> {
    raw.map_err(|_| {
        ProviderError::diagnostic(
            "Unable to get PATH",
            "Failed to retrieve the PATH environment variable.",
        )
    })
}

fn collect() -> Result<SystemInfoModel, ProviderError> {
    let hostname = System::host_name().ok_or_else(|| {
        ProviderError::diagnostic(
            "Unable to get system info",
            "An unexpected error occurred while getting the hostname.",
        )
    })?;

    let platform = System::distribution_id();
    let platform_info = PlatformInfo {
        platform_family: platform_family(&platform).to_string(),
        platform_version: System::os_version().unwrap_or_default(),
        kernel_version: System::kernel_version().unwrap_or_default(),
        kernel_arch: std::env::consts::ARCH.to_string(),
        platform,
    };

    let mut sys = System::new();
    sys.refresh_cpu();
    sys.refresh_memory();

    let working_dir = std::env::current_dir().map_err(|e| {
        ProviderError::diagnostic(
            "Unable to get working directory",
            format!(
                "An unexpected error occurred while getting the working directory: {}",
                e
            ),
        )
    })?;

    let disk_info = disk_usage(&working_dir)?;

    let path = search_path(std::env::var("PATH"))?;

    let home = dirs::home_dir().ok_or_else(|| {
        ProviderError::diagnostic(
            "Unable to get home directory",
            "An unexpected error occurred while getting the home directory.",
        )
    })?;

    Ok(SystemInfoModel {
        hostname,
        os: std::env::consts::OS.to_string(),
        platform_info,
        num_cpus: sys.cpus().len() as i64,
        memory_total: sys.total_memory() as i64,
        disk_info,
        proc_info: proc_info(),
        home: home.to_string_lossy().into_owned(),
        path,
        working_dir: working_dir.to_string_lossy().into_owned(),
    })
}

/// Usage of the filesystem whose mount point is the closest ancestor of `dir`.
fn disk_usage(dir: &Path) -> Result<DiskInfo, ProviderError> {
    let disks = Disks::new_with_refreshed_list();
    let mounts: Vec<(PathBuf, u64, u64)> = disks
        .list()
        .iter()
        .map(|d| (d.mount_point().to_path_buf(), d.total_space(), d.available_space()))
        .collect();

    if let Some(&(_, total, free)) = closest_mount(dir, &mounts) {
        return Ok(DiskInfo {
            total: total as i64,
            used: total.saturating_sub(free) as i64,
            free: free as i64,
        });
    }

    statfs_usage(dir)
}

// Overlay and other virtual root filesystems are not listed by sysinfo.
#[cfg(unix)]
fn statfs_usage(dir: &Path) -> Result<DiskInfo, ProviderError> {
    let stat = nix::sys::statvfs::statvfs(dir).map_err(|e| {
        ProviderError::diagnostic(
            "Unable to get disk info",
            format!("An unexpected error occurred while getting disk information: {}", e),
        )
    })?;

    let fragment = stat.fragment_size() as u64;
    let total = stat.blocks() as u64 * fragment;
    let used = (stat.blocks() as u64).saturating_sub(stat.blocks_free() as u64) * fragment;
    let free = stat.blocks_available() as u64 * fragment;

    Ok(DiskInfo {
        total: total as i64,
        used: used as i64,
        free: free as i64,
    })
}

#[cfg(not(unix))]
fn statfs_usage(dir: &Path) -> Result<DiskInfo, ProviderError> {
    Err(ProviderError::diagnostic(
        "Unable to get disk info",
        format!("No mounted filesystem contains {}", dir.display()),
    ))
}

fn closest_mount<'a>(
    dir: &Path,
    mounts: &'a [(PathBuf, u64, u64)],
) -> Option<&'a (PathBuf, u64, u64)> {
    mounts
        .iter()
        .filter(|(mount, _, _)| dir.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.components().count())
}

fn platform_family(platform: &str) -> &str {
    match platform {
        "debian" | "ubuntu" | "linuxmint" | "raspbian" | "pop" | "neon" => "debian",
        "rhel" | "centos" | "rocky" | "almalinux" | "ol" | "amzn" | "scientific" => "rhel",
        "fedora" => "fedora",
        "arch" | "manjaro" | "endeavouros" | "archarm" => "arch",
        "opensuse" | "opensuse-leap" | "opensuse-tumbleweed" | "sles" | "sled" => "suse",
        "alpine" => "alpine",
        "gentoo" => "gentoo",
        other => other,
    }
}

#[cfg(unix)]
fn proc_info() -> ProcInfo {
    use nix::unistd::{getgid, getpid, getppid, getuid};

    ProcInfo {
        uid: getuid().as_raw() as i64,
        gid: getgid().as_raw() as i64,
        pid: getpid().as_raw() as i64,
        ppid: getppid().as_raw() as i64,
    }
}

#[cfg(not(unix))]
fn proc_info() -> ProcInfo {
    ProcInfo {
        uid: -1,
        gid: -1,
        pid: std::process::id() as i64,
        ppid: -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_reports_every_attribute() {
        let response = SystemInfoDataSource
            .read(&Context::background(), Value::Null)
            .await
            .unwrap();
        let state = response.state.as_object().unwrap();

        for key in [
            "hostname",
            "os",
            "platform_info",
            "num_cpus",
            "memory_total",
            "disk_info",
            "proc_info",
            "home",
            "path",
            "working_dir",
        ] {
            assert!(state.contains_key(key), "missing {}", key);
        }

        assert_eq!(state["os"], std::env::consts::OS);
        assert_eq!(state["platform_info"]["kernel_arch"], std::env::consts::ARCH);
        assert!(state["memory_total"].as_i64().unwrap() > 0);
        assert_eq!(
            state["proc_info"]["pid"].as_i64().unwrap(),
            std::process::id() as i64
        );
        assert_eq!(
            state["working_dir"],
            std::env::current_dir().unwrap().to_string_lossy().into_owned()
        );
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let err = search_path(Err(std::env::VarError::NotPresent)).unwrap_err();
        assert!(err.to_string().starts_with("Unable to get PATH"));
        assert_eq!(search_path(Ok("/usr/bin".to_string())).unwrap(), "/usr/bin");
    }

    #[test]
    fn test_platform_family_mapping() {
        assert_eq!(platform_family("ubuntu"), "debian");
        assert_eq!(platform_family("rocky"), "rhel");
        assert_eq!(platform_family("nixos"), "nixos");
    }

    #[test]
    fn test_closest_mount_prefers_deepest() {
        let mounts = vec![
            (PathBuf::from("/"), 100, 40),
            (PathBuf::from("/home"), 50, 10),
            (PathBuf::from("/home/other"), 5, 1),
        ];
        let (mount, total, free) = closest_mount(Path::new("/home/user/project"), &mounts).unwrap();
        assert_eq!(mount, &PathBuf::from("/home"));
        assert_eq!((*total, *free), (50, 10));
    }

    #[test]
    fn test_closest_mount_none() {
        let mounts = vec![(PathBuf::from("/mnt/data"), 1, 1)];
        assert!(closest_mount(Path::new("/home/user"), &mounts).is_none());
    }

    #[test]
    fn test_proc_info_reports_current_process() {
        let info = proc_info();
        assert_eq!(info.pid, std::process::id() as i64);
    }

    #[test]
    fn test_schema_nested_objects() {
        let schema = SystemInfoDataSource.schema();
        let disk = schema.attribute("disk_info").unwrap();
        assert_eq!(disk.kind, AttributeType::Object);
        let names: Vec<&str> = disk.attributes.iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["total", "used", "free"]);
    }
}
