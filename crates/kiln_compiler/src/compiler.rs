//! The asset compiler: registry, queue, workers and runtime integration.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant, SystemTime};

use kiln_cache::{CacheStore, VersionCheck};
use kiln_common::{meta_path, resource_part};
use kiln_config::{CompilerKind, KilnConfig, TypeConfig, DEFAULT_CACHE_DIR, DEFAULT_COMPRESSION_THRESHOLD};
use tracing::{debug, error, info, instrument, warn};

use crate::deps::DependencyTracker;
use crate::error::{CompileError, CompilerError};
use crate::hook::{LoadAction, LoadHook, ResourceRuntime, ResourceState};
use crate::index::RegistryIndex;
use crate::observer::{CompiledFn, ListChangedFn, Observers};
use crate::plugin::{CompileContext, Compiler, CopyCompiler};
use crate::queue::{CompileJob, CompileProgress, CompileQueue, CompletedJob, Dispatch};
use crate::reconcile::{self, normalize, ChangeReconciler};
use crate::registry::ResourceRegistry;
use crate::resource::ResourceType;
use crate::scan::{scan_dir, ScanResult};

/// Sleep between ticks in [`AssetCompiler::run_until_idle`].
const IDLE_POLL: Duration = Duration::from_millis(5);

/// Paths and tuning for an [`AssetCompiler`].
#[derive(Debug, Clone)]
pub struct CompilerSettings {
    /// Directory logical resource paths are relative to.
    pub source_root: PathBuf,
    /// Directory holding artifacts, the version marker and the index.
    pub cache_dir: PathBuf,
    /// Payloads larger than this are considered for compression.
    pub compression_threshold: usize,
    /// Worker threads; `0` lets the pool pick.
    pub workers: usize,
    /// Jobs dispatched per update tick; `0` dispatches all of them.
    pub jobs_per_tick: usize,
    /// Paths whose watcher notifications are dropped.
    pub ignore: Vec<String>,
}

impl CompilerSettings {
    /// Default settings for a source root, with the cache inside it.
    pub fn new(source_root: &Path) -> Self {
        Self {
            source_root: source_root.to_path_buf(),
            cache_dir: source_root.join(DEFAULT_CACHE_DIR),
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            workers: 0,
            jobs_per_tick: 0,
            ignore: Vec::new(),
        }
    }

    /// Settings for the project at `project_dir` described by `config`.
    pub fn from_config(project_dir: &Path, config: &KilnConfig) -> Self {
        let source_root = match config.project.source_root.as_str() {
            "" | "." => project_dir.to_path_buf(),
            root => project_dir.join(root),
        };
        Self {
            source_root,
            cache_dir: project_dir.join(&config.cache.dir),
            compression_threshold: config.cache.compression_threshold,
            workers: config.compiler.workers,
            jobs_per_tick: config.compiler.jobs_per_tick,
            ignore: config.watch.ignore.clone(),
        }
    }
}

#[derive(Default)]
struct InitState {
    finished: bool,
    deferred: Vec<String>,
}

/// Compiles resources in the background and keeps them fresh.
///
/// All methods take `&self`; share the compiler between the update thread
/// and watcher threads with an [`Arc`].
pub struct AssetCompiler {
    settings: CompilerSettings,
    store: Arc<CacheStore>,
    version: VersionCheck,
    registry: ResourceRegistry,
    dependencies: Mutex<DependencyTracker>,
    compilers: RwLock<HashMap<ResourceType, Arc<dyn Compiler>>>,
    queue: CompileQueue,
    changes: ChangeReconciler,
    observers: Observers,
    init: Mutex<InitState>,
    /// Deferred loads that turned out not to need compiling.
    resumable: Mutex<Vec<String>>,
    /// Reference time for directory rescans.
    scanned_at: Mutex<SystemTime>,
    pool: rayon::ThreadPool,
}

impl AssetCompiler {
    /// Opens the cache and starts the worker pool.
    ///
    /// Fails if the cache directory cannot be created or its version marker
    /// cannot be written.
    pub fn open(settings: CompilerSettings) -> Result<Self, CompilerError> {
        let (store, version) = CacheStore::open(
            &settings.source_root,
            &settings.cache_dir,
            settings.compression_threshold,
        )?;
        if let VersionCheck::Rebuilt { found, removed } = &version {
            info!(?found, removed, "cache directory rebuilt");
        }

        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("kiln-compile-{i}"));
        if settings.workers > 0 {
            builder = builder.num_threads(settings.workers);
        }
        let pool = builder.build().map_err(|e| CompilerError::WorkerPool {
            reason: e.to_string(),
        })?;

        info!(
            source_root = %settings.source_root.display(),
            cache_dir = %settings.cache_dir.display(),
            workers = pool.current_num_threads(),
            "asset compiler ready"
        );
        Ok(Self {
            changes: ChangeReconciler::new(settings.ignore.clone()),
            settings,
            store: Arc::new(store),
            version,
            registry: ResourceRegistry::new(),
            dependencies: Mutex::new(DependencyTracker::new()),
            compilers: RwLock::new(HashMap::new()),
            queue: CompileQueue::new(),
            observers: Observers::default(),
            init: Mutex::new(InitState::default()),
            resumable: Mutex::new(Vec::new()),
            scanned_at: Mutex::new(SystemTime::UNIX_EPOCH),
            pool,
        })
    }

    /// Returns the settings the compiler was opened with.
    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Returns the source root.
    pub fn source_root(&self) -> &Path {
        self.store.source_root()
    }

    /// Returns the artifact store.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Returns what the start-up version check found.
    pub fn version_check(&self) -> &VersionCheck {
        &self.version
    }

    /// Returns the resource registry.
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    // --- Resource types ------------------------------------------------

    /// Maps an extension to a resource type.
    pub fn register_extension(&self, ext: &str, ty: ResourceType) -> Result<(), CompilerError> {
        self.registry.register_extension(ext, ty)
    }

    /// Resolves the resource type of a path from its extension.
    pub fn resolve_type(&self, path: &str) -> Option<ResourceType> {
        self.registry.resolve_type(path)
    }

    /// Returns `true` if `ext` is registered to `ty`.
    pub fn accepts_extension(&self, ext: &str, ty: &ResourceType) -> bool {
        self.registry.accepts_extension(ext, ty)
    }

    /// Installs the compiler for a resource type, replacing any previous one.
    pub fn add_compiler(&self, ty: ResourceType, compiler: Arc<dyn Compiler>) {
        debug!(resource_type = %ty, "compiler registered");
        self.compilers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ty, compiler);
    }

    /// Uninstalls the compiler for a resource type.
    ///
    /// Resources of that type load without compiling from then on. Returns
    /// `true` if a compiler was installed.
    pub fn remove_compiler(&self, ty: &ResourceType) -> bool {
        self.compilers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(ty)
            .is_some()
    }

    /// Registers the resource types declared in `kiln.toml`.
    pub fn configure_types(&self, types: &BTreeMap<String, TypeConfig>) -> Result<(), CompilerError> {
        for (name, config) in types {
            let ty = ResourceType::new(name);
            for ext in &config.extensions {
                self.register_extension(ext, ty.clone())?;
            }
            match config.compiler {
                CompilerKind::Copy => self.add_compiler(ty, Arc::new(CopyCompiler)),
                CompilerKind::None => {}
            }
        }
        Ok(())
    }

    fn compiler_for(&self, path: &str) -> Option<Arc<dyn Compiler>> {
        let ty = self.resolve_type(path)?;
        self.compilers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ty)
            .cloned()
    }

    /// Returns `true` if a compiler is installed for the type of `path`.
    pub fn has_compiler(&self, path: &str) -> bool {
        self.compiler_for(path).is_some()
    }

    // --- Registry ------------------------------------------------------

    /// Registers a resource, notifying list observers if it is new.
    pub fn add_resource(&self, ty: ResourceType, path: &str) {
        if self.registry.register(ty, path) {
            self.observers.notify_list_changed(path);
        }
    }

    /// Registers every resource the source file `file` produces.
    ///
    /// Returns `false` if no compiler handles the file.
    pub fn register_source(&self, file: &str) -> bool {
        let Some(compiler) = self.compiler_for(file) else {
            return false;
        };
        for path in compiler.discover(file, &self.store.source_path(file)) {
            match self.resolve_type(&path) {
                Some(ty) => self.add_resource(ty, &path),
                None => debug!(path = %path, source = file, "discovered resource has no type"),
            }
        }
        true
    }

    /// Unregisters every resource produced by `file` and deletes their
    /// artifacts.
    ///
    /// A compile of `file` that is still queued or running is superseded, so
    /// its result is dropped when drained.
    pub fn remove_source(&self, file: &str) -> Vec<String> {
        self.queue.supersede(file);
        let removed = self.registry.remove_source(file);
        for path in &removed {
            self.store.remove(path);
        }
        if !removed.is_empty() {
            self.observers.notify_list_changed(file);
        }
        removed
    }

    /// Unregisters every resource under `dir` and deletes their artifacts.
    pub fn remove_dir(&self, dir: &str) -> Vec<String> {
        let removed = self.registry.remove_under(dir);
        for path in &removed {
            self.queue.supersede(resource_part(path));
            self.store.remove(path);
        }
        self.observers.notify_list_changed(dir);
        removed
    }

    /// Scans `dir` against the registry.
    pub fn scan(&self, dir: &str) -> ScanResult {
        let since = {
            let mut scanned_at = self.scanned_at.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *scanned_at, SystemTime::now())
        };
        let known = self.registry.source_files();
        scan_dir(
            self.store.source_root(),
            dir,
            self.store.cache_dir(),
            since,
            &known,
        )
    }

    // --- Start-up -------------------------------------------------------

    /// Loads the persisted index and scans the source root, then queues the
    /// loads deferred while start-up was in progress.
    ///
    /// Call once every resource type and compiler is registered. Later
    /// calls do nothing.
    pub fn finish_init(&self) -> ScanResult {
        let deferred = {
            let mut init = self.lock_init();
            if init.finished {
                return ScanResult::default();
            }
            init.finished = true;
            std::mem::take(&mut init.deferred)
        };

        let scan = self.fill_db();

        let mut resumable = Vec::new();
        for path in deferred {
            let file = resource_part(&path);
            if self.store.is_fresh(&path) || !self.has_compiler(file) {
                resumable.push(path);
            } else {
                self.push(file);
            }
        }
        self.resumable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(resumable);
        scan
    }

    /// Returns `true` once [`finish_init`](Self::finish_init) has run.
    pub fn is_init_finished(&self) -> bool {
        self.lock_init().finished
    }

    #[instrument(level = "debug", skip(self))]
    fn fill_db(&self) -> ScanResult {
        let cache_dir = self.store.cache_dir();
        let mut since = SystemTime::UNIX_EPOCH;

        match RegistryIndex::load(cache_dir) {
            Some(index) => {
                since = RegistryIndex::modified(cache_dir).unwrap_or(SystemTime::UNIX_EPOCH);
                let mut pruned = 0usize;
                for path in &index.resources {
                    if !self.store.source_path(path).is_file() {
                        self.store.remove(path);
                        pruned += 1;
                    } else if let Some(ty) = self.resolve_type(path) {
                        self.registry.register(ty, path);
                    }
                }
                *self.lock_deps() = DependencyTracker::from_edges(index.dependencies);
                info!(
                    resources = index.resources.len(),
                    pruned, "loaded registry index"
                );
            }
            None => debug!("no usable registry index"),
        }

        *self.scanned_at.lock().unwrap_or_else(PoisonError::into_inner) = since;
        let scan = self.scan("");
        for file in scan.dirty() {
            self.register_source(file);
        }
        for file in &scan.deleted_files {
            self.remove_source(file);
        }
        info!(
            new = scan.new_files.len(),
            modified = scan.modified_files.len(),
            deleted = scan.deleted_files.len(),
            registered = self.registry.len(),
            "scanned source root"
        );
        scan
    }

    // --- Dependencies ---------------------------------------------------

    /// Records that `from` must be recompiled when `on` changes.
    pub fn register_dependency(&self, from: &str, on: &str) {
        self.lock_deps().register_dependency(from, on);
    }

    /// Returns the resources that depend on `on`.
    pub fn dependents(&self, on: &str) -> Vec<String> {
        self.lock_deps().dependents(on).to_vec()
    }

    // --- Queue ----------------------------------------------------------

    /// Queues a compile of the source file `file`, returning its generation.
    pub fn push(&self, file: &str) -> u32 {
        let generation = self.queue.push(file);
        debug!(path = file, generation, "queued compile");
        generation
    }

    /// Returns the latest generation queued for `file`.
    pub fn generation(&self, file: &str) -> Option<u32> {
        self.queue.generation(file)
    }

    /// Queues every registered source with a stale or missing artifact.
    ///
    /// Returns the number of jobs queued.
    pub fn queue_stale(&self) -> usize {
        self.queue_sources(self.stale_sources())
    }

    /// Returns the compilable source files with a stale or missing artifact.
    pub fn stale_sources(&self) -> BTreeSet<String> {
        let stale: BTreeSet<String> = self
            .registry
            .lock()
            .values()
            .filter(|item| !self.store.is_fresh(&item.path))
            .map(|item| resource_part(&item.path).to_string())
            .collect();
        stale.into_iter().filter(|f| self.has_compiler(f)).collect()
    }

    /// Queues every registered source regardless of freshness.
    pub fn queue_all(&self) -> usize {
        self.queue_sources(self.registry.source_files())
    }

    fn queue_sources(&self, files: BTreeSet<String>) -> usize {
        let mut queued = 0;
        for file in files.iter().filter(|f| self.has_compiler(f)) {
            self.push(file);
            queued += 1;
        }
        queued
    }

    /// Dispatches the most recently queued job.
    ///
    /// A superseded job is dropped instead. Returns `false` if nothing was
    /// pending.
    pub fn run_one(&self) -> bool {
        match self.queue.pop() {
            None => false,
            Some(Dispatch::Superseded(job)) => {
                debug!(path = %job.path, generation = job.generation, "skipping superseded job");
                true
            }
            Some(Dispatch::Run(job)) => {
                self.dispatch(job);
                true
            }
        }
    }

    fn dispatch_pending(&self) {
        let limit = self.settings.jobs_per_tick;
        let mut dispatched = 0;
        while limit == 0 || dispatched < limit {
            match self.queue.pop() {
                None => break,
                Some(Dispatch::Superseded(job)) => {
                    debug!(path = %job.path, generation = job.generation, "skipping superseded job");
                }
                Some(Dispatch::Run(job)) => {
                    self.dispatch(job);
                    dispatched += 1;
                }
            }
        }
    }

    fn dispatch(&self, job: CompileJob) {
        debug!(path = %job.path, generation = job.generation, "dispatching compile");
        let compiler = self.compiler_for(&job.path);
        let store = Arc::clone(&self.store);
        let sink = self.queue.sink();
        self.pool.spawn(move || sink.complete(run_job(compiler.as_deref(), &store, job)));
    }

    /// Returns the current batch progress.
    pub fn progress(&self) -> CompileProgress {
        self.queue.progress()
    }

    /// Returns `true` if no job is pending or running and no change is
    /// waiting to be reconciled.
    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
            && self.changes.is_empty()
            && self
                .resumable
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty()
    }

    // --- Update tick ----------------------------------------------------

    /// Runs one tick on the update thread.
    ///
    /// Resumes deferred loads that need no compile, applies finished jobs,
    /// reconciles watcher changes and dispatches pending jobs.
    pub fn update(&self, runtime: &dyn ResourceRuntime) {
        self.resume_deferred(runtime);
        for job in self.queue.take_completed() {
            self.apply_completed(job, runtime);
        }
        let changes = self.changes.take();
        if !changes.is_empty() {
            reconcile::apply(self, changes);
        }
        self.dispatch_pending();
    }

    /// Ticks until idle or until `timeout` elapses.
    ///
    /// Returns `true` if the compiler went idle. A timeout too large to
    /// represent as a deadline waits indefinitely.
    pub fn run_until_idle(&self, runtime: &dyn ResourceRuntime, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            self.update(runtime);
            if self.is_idle() {
                return true;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                let progress = self.progress();
                warn!(
                    remaining = progress.remaining,
                    current = progress.current.as_deref().unwrap_or(""),
                    "timed out waiting for compiles"
                );
                return false;
            }
            std::thread::sleep(IDLE_POLL);
        }
    }

    fn resume_deferred(&self, runtime: &dyn ResourceRuntime) {
        let paths =
            std::mem::take(&mut *self.resumable.lock().unwrap_or_else(PoisonError::into_inner));
        for path in paths {
            if runtime.state(&path) == Some(ResourceState::Hooked) {
                runtime.continue_load(&path, true);
            }
        }
    }

    fn apply_completed(&self, job: CompletedJob, runtime: &dyn ResourceRuntime) {
        if !self.queue.is_current(&job.path, job.generation) {
            debug!(path = %job.path, generation = job.generation, "discarding superseded result");
            self.discard_orphaned(&job.outputs);
            return;
        }

        if !job.dependencies.is_empty() {
            let mut deps = self.lock_deps();
            for on in &job.dependencies {
                deps.register_dependency(&job.path, on);
            }
        }
        let orphaned = self.discard_orphaned(&job.outputs);
        for output in job.outputs.iter().filter(|o| !orphaned.contains(o)) {
            self.registry.ensure(output);
        }

        let mut paths: Vec<String> = self
            .registry
            .items_for_source(&job.path)
            .into_iter()
            .map(|item| item.path)
            .collect();
        if paths.is_empty() {
            warn!(path = %job.path, "compiled resource is not registered");
            for candidate in self.registry.similar_paths(&job.path) {
                warn!(path = %job.path, candidate = %candidate, "did you mean this path?");
            }
        }
        if !paths.contains(&job.path) {
            paths.push(job.path.clone());
        }

        for path in &paths {
            match runtime.state(path) {
                Some(ResourceState::Ready | ResourceState::Failed) => runtime.reload(path),
                Some(ResourceState::Hooked) => runtime.continue_load(path, job.success),
                _ => {}
            }
            self.observers.notify_compiled(path, job.success);
        }

        for dependent in self.dependents(&job.path) {
            debug!(path = %dependent, dependency = %job.path, "queueing dependent");
            self.push(&dependent);
        }
    }

    /// Deletes artifacts written for sources that no longer exist, returning
    /// the affected resource paths.
    fn discard_orphaned<'a>(&self, outputs: &'a [String]) -> Vec<&'a String> {
        let mut orphaned = Vec::new();
        for output in outputs {
            if !self.store.source_path(resource_part(output)).is_file() {
                debug!(path = %output, "source removed while compiling");
                self.store.remove(output);
                orphaned.push(output);
            }
        }
        orphaned
    }

    // --- Watcher --------------------------------------------------------

    /// Records a file-watcher notification for `path`, relative to the
    /// source root. Safe to call from any thread.
    pub fn on_file_changed(&self, path: &str) {
        let path = normalize(path);
        if path.is_empty() {
            return;
        }
        let full = self.store.source_root().join(&path);
        if full.starts_with(self.store.cache_dir()) {
            return;
        }
        self.changes.record(&path, full.is_dir());
    }

    pub(crate) fn notify_list_changed(&self, path: &str) {
        self.observers.notify_list_changed(path);
    }

    // --- Observers ------------------------------------------------------

    /// Adds an observer for changes to the resource list.
    pub fn on_list_changed(&self, f: ListChangedFn) {
        self.observers.on_list_changed(f);
    }

    /// Adds an observer for finished compiles.
    pub fn on_resource_compiled(&self, f: CompiledFn) {
        self.observers.on_resource_compiled(f);
    }

    // --- Artifacts and sidecars -------------------------------------------

    /// Writes an artifact and registers `path` if it is not yet known.
    pub fn write_compiled_resource(&self, path: &str, data: &[u8]) -> bool {
        if !self.store.write(path, data) {
            return false;
        }
        if self.registry.ensure(path) {
            self.observers.notify_list_changed(path);
        }
        true
    }

    /// Stores the source of `path` unchanged as its artifact.
    pub fn copy_compile(&self, path: &str) -> bool {
        let source = self.store.source_path(path);
        match std::fs::read(&source) {
            Ok(data) => self.write_compiled_resource(path, &data),
            Err(e) => {
                error!(path = %source.display(), error = %e, "could not read source");
                false
            }
        }
    }

    /// Reads the `.meta` sidecar of `path`.
    pub fn read_meta(&self, path: &str) -> Option<Vec<u8>> {
        std::fs::read(self.store.source_root().join(meta_path(path))).ok()
    }

    /// Replaces the `.meta` sidecar of `path`.
    ///
    /// The watcher picks the change up and recompiles the resource.
    pub fn update_meta(&self, path: &str, data: &[u8]) -> bool {
        let meta = self.store.source_root().join(meta_path(path));
        match std::fs::write(&meta, data) {
            Ok(()) => true,
            Err(e) => {
                error!(path = %meta.display(), error = %e, "could not write meta file");
                false
            }
        }
    }

    // --- Persistence ----------------------------------------------------

    /// Writes the registry and dependency graph to the cache directory.
    pub fn save_index(&self) -> Result<(), CompilerError> {
        let index = RegistryIndex::new(self.registry.paths(), self.lock_deps().to_sorted());
        index.save(self.store.cache_dir())?;
        info!(resources = index.resources.len(), "saved registry index");
        Ok(())
    }

    fn lock_deps(&self) -> MutexGuard<'_, DependencyTracker> {
        self.dependencies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_init(&self) -> MutexGuard<'_, InitState> {
        self.init.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LoadHook for AssetCompiler {
    fn before_load(&self, path: &str) -> LoadAction {
        let source = self.store.source_path(path);
        if !source.is_file() || source.starts_with(self.store.cache_dir()) {
            return LoadAction::Immediate;
        }
        if self.store.is_fresh(path) {
            return LoadAction::Immediate;
        }
        {
            let mut init = self.lock_init();
            if !init.finished {
                debug!(path, "deferring load until start-up finishes");
                init.deferred.push(path.to_string());
                return LoadAction::Deferred;
            }
        }
        let file = resource_part(path);
        if !self.has_compiler(file) {
            return LoadAction::Immediate;
        }
        self.push(file);
        LoadAction::Deferred
    }

    fn on_raw_dependency_read(&self, requester: &str, dependency: &str) {
        self.register_dependency(resource_part(requester), dependency);
    }
}

/// Compiles one job on a worker thread.
fn run_job(compiler: Option<&dyn Compiler>, store: &CacheStore, job: CompileJob) -> CompletedJob {
    let mut ctx = CompileContext::new(&job.path, store);
    let success = match catch_unwind(AssertUnwindSafe(|| compile_with(compiler, &mut ctx))) {
        Ok(Ok(bytes)) => store.write(&job.path, &bytes),
        Ok(Err(e)) => {
            error!(path = %job.path, error = %e, "failed to compile resource");
            false
        }
        Err(_) => {
            error!(path = %job.path, "compiler panicked");
            false
        }
    };
    let (dependencies, mut outputs) = ctx.into_parts();
    if success {
        outputs.insert(0, job.path.clone());
    }
    CompletedJob {
        path: job.path,
        generation: job.generation,
        success,
        dependencies,
        outputs,
    }
}

fn compile_with(
    compiler: Option<&dyn Compiler>,
    ctx: &mut CompileContext<'_>,
) -> Result<Vec<u8>, CompileError> {
    match compiler {
        Some(compiler) => compiler.compile(ctx),
        None => Err(CompileError::NoCompiler {
            path: ctx.path().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::NullRuntime;

    fn open(dir: &Path) -> AssetCompiler {
        let mut settings = CompilerSettings::new(dir);
        settings.workers = 2;
        let compiler = AssetCompiler::open(settings).unwrap();
        let texture = ResourceType::new("texture");
        compiler.register_extension("png", texture.clone()).unwrap();
        compiler.add_compiler(texture, Arc::new(CopyCompiler));
        compiler
    }

    #[test]
    fn settings_from_config() {
        let config = kiln_config::load_config_from_str(
            "[project]\nname = \"p\"\nsource_root = \"assets\"\n[compiler]\njobs_per_tick = 3\n",
        )
        .unwrap();
        let settings = CompilerSettings::from_config(Path::new("/proj"), &config);
        assert_eq!(settings.source_root, Path::new("/proj/assets"));
        assert_eq!(settings.cache_dir, Path::new("/proj/.kiln/resources"));
        assert_eq!(settings.jobs_per_tick, 3);

        let config = kiln_config::load_config_from_str("[project]\nname = \"p\"\n").unwrap();
        let settings = CompilerSettings::from_config(Path::new("/proj"), &config);
        assert_eq!(settings.source_root, Path::new("/proj"));
    }

    #[test]
    fn configure_types_installs_copy_compilers() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = AssetCompiler::open(CompilerSettings::new(dir.path())).unwrap();
        let config = kiln_config::load_config_from_str(
            "[project]\nname = \"p\"\n[types.texture]\nextensions = [\"png\"]\n[types.shader]\nextensions = \"glsl\"\ncompiler = \"none\"\n",
        )
        .unwrap();
        compiler.configure_types(&config.types).unwrap();
        assert!(compiler.has_compiler("a.png"));
        assert!(!compiler.has_compiler("a.glsl"));
        assert_eq!(compiler.resolve_type("a.glsl"), Some(ResourceType::new("shader")));
        assert!(compiler.accepts_extension("PNG", &ResourceType::new("texture")));
    }

    #[test]
    fn remove_compiler_makes_loads_immediate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"px").unwrap();
        let compiler = open(dir.path());
        compiler.finish_init();
        assert!(compiler.remove_compiler(&ResourceType::new("texture")));
        assert!(!compiler.remove_compiler(&ResourceType::new("texture")));
        assert_eq!(compiler.before_load("a.png"), LoadAction::Immediate);
    }

    #[test]
    fn loads_inside_cache_dir_are_immediate() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = open(dir.path());
        compiler.finish_init();
        std::fs::write(compiler.store().cache_dir().join("x.png"), b"px").unwrap();
        assert_eq!(
            compiler.before_load(".kiln/resources/x.png"),
            LoadAction::Immediate
        );
    }

    #[test]
    fn finish_init_registers_sources_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("tex")).unwrap();
        std::fs::write(dir.path().join("tex/a.png"), b"px").unwrap();
        std::fs::write(dir.path().join("tex/readme.txt"), b"notes").unwrap();
        let compiler = open(dir.path());

        let scan = compiler.finish_init();
        assert_eq!(scan.new_files, vec!["tex/a.png", "tex/readme.txt"]);
        assert_eq!(compiler.registry().paths(), vec!["tex/a.png"]);
        assert!(compiler.is_init_finished());
        assert!(compiler.finish_init().is_empty());
    }

    #[test]
    fn queue_stale_skips_fresh_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"a").unwrap();
        std::fs::write(dir.path().join("b.png"), b"b").unwrap();
        let compiler = open(dir.path());
        compiler.finish_init();
        assert!(compiler.copy_compile("a.png"));

        assert_eq!(compiler.queue_stale(), 1);
        assert_eq!(compiler.generation("b.png"), Some(1));
        assert_eq!(compiler.generation("a.png"), None);
        assert!(compiler.run_until_idle(&NullRuntime, Duration::from_secs(10)));
        assert_eq!(compiler.store().read("b.png").unwrap(), b"b");
        assert_eq!(compiler.queue_stale(), 0);
        assert_eq!(compiler.queue_all(), 2);
    }

    #[test]
    fn write_compiled_resource_registers_path() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = open(dir.path());
        compiler.finish_init();
        assert!(compiler.write_compiled_resource("gen/atlas.png", b"atlas"));
        assert!(compiler.registry().contains("gen/atlas.png"));
        assert_eq!(compiler.store().read("gen/atlas.png").unwrap(), b"atlas");
    }

    #[test]
    fn copy_compile_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = open(dir.path());
        assert!(!compiler.copy_compile("missing.png"));
    }

    #[test]
    fn meta_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = open(dir.path());
        assert!(compiler.read_meta("a.png").is_none());
        assert!(compiler.update_meta("a.png", b"filter = \"point\""));
        assert_eq!(compiler.read_meta("a.png").unwrap(), b"filter = \"point\"");
        assert!(dir.path().join("a.png.meta").is_file());
    }

    #[test]
    fn cache_dir_changes_are_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = CompilerSettings::new(dir.path());
        settings.cache_dir = dir.path().join("cache");
        let compiler = AssetCompiler::open(settings).unwrap();
        compiler.on_file_changed("cache/abc.res");
        assert!(compiler.is_idle());
        compiler.on_file_changed("tex/a.png");
        assert!(!compiler.is_idle());
    }

    #[test]
    fn run_job_reports_panics_as_failures() {
        struct Panics;
        impl Compiler for Panics {
            fn compile(&self, _ctx: &mut CompileContext<'_>) -> Result<Vec<u8>, crate::CompileError> {
                panic!("boom");
            }
        }
        let dir = tempfile::tempdir().unwrap();
        let compiler = open(dir.path());
        let job = CompileJob {
            path: "a.png".to_string(),
            generation: 1,
        };
        let done = run_job(Some(&Panics), compiler.store(), job);
        assert!(!done.success);
        assert!(done.outputs.is_empty());
    }

    #[test]
    fn run_job_without_compiler_fails() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = open(dir.path());
        let job = CompileJob {
            path: "a.xyz".to_string(),
            generation: 3,
        };
        let done = run_job(None, compiler.store(), job);
        assert!(!done.success);
        assert_eq!(done.generation, 3);
        assert!(done.outputs.is_empty());
    }

    #[test]
    fn huge_timeout_does_not_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = open(dir.path());
        compiler.finish_init();
        assert!(compiler.run_until_idle(&NullRuntime, Duration::MAX));
    }

    #[test]
    fn missing_compiler_is_a_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = open(dir.path());
        let mut ctx = CompileContext::new("a.xyz", compiler.store());
        match compile_with(None, &mut ctx) {
            Err(CompileError::NoCompiler { path }) => assert_eq!(path, "a.xyz"),
            other => panic!("expected NoCompiler, got {other:?}"),
        }
    }
}
