//! The five provisioning stages
//!
//! Each stage builds its resources, converges them, and returns what it
//! learned. Stages never touch the session; the orchestrator records their
//! outcomes.

use declarative::{
    ApplyContext, BoxedResource, Error, ExecuteSummary, Result, apply_resource, converge,
};
use std::path::{Path, PathBuf};

use super::{Invocation, Provisioner};
use crate::identity::{RealUser, resolve_real_user};
use crate::paths::expand_home;
use crate::resource::{
    ArchiveExtraction, EncryptedVolume, HomeDirectory, LoginShell, Mount, PackageSet,
    PinnedPackages, RepositoryClone, ServiceSet, StowDeployment, Symlink,
};

pub struct IdentityOutcome {
    pub user: RealUser,
    pub home: PathBuf,
    pub summary: ExecuteSummary,
}

pub struct ConfigOutcome {
    pub mapper_name: String,
    pub mount_point: PathBuf,
    pub dotfiles_archive: Option<PathBuf>,
}

pub struct InfrastructureOutcome {
    pub unlocked: bool,
    pub mounted: bool,
    pub summary: ExecuteSummary,
}

pub struct UserSpaceOutcome {
    pub stow_source: PathBuf,
    pub stow_target: PathBuf,
    pub summary: ExecuteSummary,
}

fn converge_boxed(resources: &[BoxedResource], ctx: &mut ApplyContext) -> Result<ExecuteSummary> {
    converge(resources.iter().map(|r| &**r), ctx)
}

impl Provisioner<'_> {
    /// Find the operator and make sure their home directory is usable
    pub(super) fn resolve_identity(
        &self,
        invocation: &Invocation,
        ctx: &mut ApplyContext,
    ) -> Result<IdentityOutcome> {
        let user = resolve_real_user(self.evidence, self.users)?;
        ctx.detail(format!(
            "real user: {} (UID {}, GID {})",
            user.name, user.uid, user.gid
        ));

        let declared = &invocation.blueprint.identity.username;
        if *declared != user.name {
            ctx.warn(format!(
                "blueprint identity '{declared}' differs from invoking user '{}'; \
                 user-space work runs as '{}'",
                user.name, user.name
            ));
        }

        let home = self.paths.home_of(&user.name);
        let dir = HomeDirectory::new(&home, user.uid, user.gid);
        let mut summary = ExecuteSummary::default();
        summary.add_result(&apply_resource(&dir, ctx)?);

        Ok(IdentityOutcome {
            user,
            home,
            summary,
        })
    }

    /// Cross-check the blueprint against the secrets and archive, and pick
    /// out what later stages need. Required keys were validated at load time.
    pub(super) fn load_config(&self, invocation: &Invocation) -> Result<ConfigOutcome> {
        if invocation.secrets.luks_password.is_empty() {
            return Err(Error::precondition("luks_password is empty"));
        }

        let stow = &invocation.blueprint.userspace.stow;
        if invocation.dotfiles_archive.is_some() && stow.source_dir.is_empty() {
            return Err(Error::precondition(
                "a dotfiles archive needs userspace.stow.source_dir to extract into",
            ));
        }
        if !stow.packages.is_empty() && (stow.source_dir.is_empty() || stow.target_dir.is_empty()) {
            return Err(Error::precondition(
                "userspace.stow needs source_dir and target_dir when packages are listed",
            ));
        }

        let luks = &invocation.blueprint.infrastructure.luks;
        Ok(ConfigOutcome {
            mapper_name: luks.mapper_name.clone(),
            mount_point: PathBuf::from(&luks.mount_point),
            dotfiles_archive: invocation.dotfiles_archive.clone(),
        })
    }

    /// Unlock the encrypted volume, then mount it if the unlock took
    pub(super) fn prepare_infrastructure(
        &self,
        invocation: &Invocation,
        config: &ConfigOutcome,
        ctx: &mut ApplyContext,
    ) -> Result<InfrastructureOutcome> {
        let luks = &invocation.blueprint.infrastructure.luks;
        let mapper_path = self.paths.mapper_device(&config.mapper_name);
        let volume = EncryptedVolume::new(
            &luks.device,
            &config.mapper_name,
            &mapper_path,
            invocation.secrets.luks_password.clone(),
        );

        let mut summary = ExecuteSummary::default();
        summary.add_result(&apply_resource(&volume, ctx)?);

        if !volume.is_unlocked()? {
            ctx.warn(format!(
                "{} did not appear after unlock; skipping mount of {}",
                mapper_path.display(),
                config.mount_point.display()
            ));
            return Ok(InfrastructureOutcome {
                unlocked: false,
                mounted: false,
                summary,
            });
        }

        let mount = Mount::new(&mapper_path, &config.mount_point);
        summary.add_result(&apply_resource(&mount, ctx)?);

        Ok(InfrastructureOutcome {
            unlocked: true,
            mounted: true,
            summary,
        })
    }

    /// Packages, pinned packages, services, login shell - in that order
    pub(super) fn configure_system(
        &self,
        invocation: &Invocation,
        ctx: &mut ApplyContext,
    ) -> Result<ExecuteSummary> {
        let system = &invocation.blueprint.system;
        let identity = &invocation.blueprint.identity;

        let mut resources: Vec<BoxedResource> = Vec::new();
        if !system.packages.is_empty() {
            resources.push(Box::new(PackageSet::new(system.packages.clone())));
        }
        if !system.pinned_packages.is_empty() {
            resources.push(Box::new(PinnedPackages::new(
                system.pinned_packages.clone(),
            )));
        }
        if !system.services.is_empty() {
            resources.push(Box::new(ServiceSet::new(system.services.clone())));
        }
        if !identity.shell.is_empty() {
            resources.push(Box::new(LoginShell::new(
                &identity.username,
                &identity.shell,
            )));
        }

        converge_boxed(&resources, ctx)
    }

    /// Archive, stow, links, clones - in that order, all as the real user
    pub(super) fn restore_user_space(
        &self,
        invocation: &Invocation,
        user: &RealUser,
        home: &Path,
        archive: Option<&Path>,
        ctx: &mut ApplyContext,
    ) -> Result<UserSpaceOutcome> {
        let userspace = &invocation.blueprint.userspace;
        let stow = &userspace.stow;
        let stow_source = expand_home(&stow.source_dir, home);
        let stow_target = expand_home(&stow.target_dir, home);

        let mut resources: Vec<BoxedResource> = Vec::new();

        if let Some(archive) = archive {
            resources.push(Box::new(ArchiveExtraction::new(
                &user.name,
                archive,
                &stow_source,
            )));
        }

        if !stow.packages.is_empty() {
            resources.push(Box::new(StowDeployment::new(
                &user.name,
                &stow_source,
                &stow_target,
                stow.packages.clone(),
            )));
        }

        for link in &userspace.links {
            resources.push(Box::new(Symlink::new(
                &user.name,
                expand_home(&link.source, home),
                expand_home(&link.target, home),
            )));
        }

        for repo in &userspace.repos {
            resources.push(Box::new(RepositoryClone::new(
                &user.name,
                &repo.url,
                expand_home(&repo.dest, home),
            )));
        }

        let summary = converge_boxed(&resources, ctx)?;
        Ok(UserSpaceOutcome {
            stow_source,
            stow_target,
            summary,
        })
    }
}
