mod cpu_hog;
mod dns_lookup;
mod environment_variables;
mod failure;
mod file_content;
mod oom_kill;
mod plan_artifact;
mod sleep;
mod system_info;
mod tcp_probe;

pub use cpu_hog::CpuHogDataSource;
pub use dns_lookup::DnsLookupDataSource;
pub use environment_variables::EnvironmentVariablesDataSource;
pub use failure::FailureDataSource;
pub use file_content::FileContentDataSource;
pub use oom_kill::OomKillDataSource;
pub use plan_artifact::PlanArtifactDataSource;
pub use sleep::SleepDataSource;
pub use system_info::SystemInfoDataSource;
pub use tcp_probe::TcpProbeDataSource;

use crate::provider::DataSource;

pub fn all() -> Vec<Box<dyn DataSource>> {
    vec![
        Box::new(PlanArtifactDataSource),
        Box::new(OomKillDataSource),
        Box::new(CpuHogDataSource),
        Box::new(EnvironmentVariablesDataSource),
        Box::new(DnsLookupDataSource),
        Box::new(TcpProbeDataSource),
        Box::new(FileContentDataSource),
        Box::new(FailureDataSource),
        Box::new(SystemInfoDataSource),
        Box::new(SleepDataSource),
    ]
}
