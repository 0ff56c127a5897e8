//! Tree owner, reconciler and update scheduler.
//!
//! # Passes
//!
//! A pass renders a set of instances, reconciles their output against what is
//! mounted, then commits: every effect queued during the pass runs, children
//! before parents. [`Root::flush`] keeps running passes over dirty instances
//! (shallowest first, each at most once per pass) until nothing is dirty.
//! A target whose render fails keeps its previous output; the pass still
//! commits for everyone else and the first error is returned.
//!
//! # Reconciliation
//!
//! Positional. The same component type at the same position is updated in
//! place with the new props; anything else unmounts the old subtree and mounts
//! the new one.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::instance::{Instance, InstanceId, Mounted, PendingEffect, UpdateQueue, Updater};
use super::node::{Child, ComponentNode, IntoNode, Node, Rendered};
use super::scope::Scope;
use crate::config::HostConfig;
use crate::error::{ConfigError, RenderError, Result};
use crate::reactive::untracked;

#[derive(Default)]
struct Pass {
    rendered: HashSet<InstanceId>,
    effects: Vec<PendingEffect>,
}

/// Owns one mounted tree.
pub struct Root {
    queue: Arc<UpdateQueue>,
    children: Vec<Mounted>,
    config: HostConfig,
}

impl Default for Root {
    fn default() -> Self {
        Self::new()
    }
}

impl Root {
    pub fn new() -> Self {
        Self::build(HostConfig::default())
    }

    /// A root using `config`, which must pass [`HostConfig::validate`].
    pub fn with_config(config: HostConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: HostConfig) -> Self {
        Self {
            queue: Arc::new(UpdateQueue::default()),
            children: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Reconcile the whole tree against `node`, commit, then flush.
    pub fn render(&mut self, node: impl IntoNode) -> Result<()> {
        let mut pass = Pass::default();
        let mut children = std::mem::take(&mut self.children);
        let result = self.reconcile(&mut children, node.into_node(), 0, &mut pass);
        self.children = children;
        result?;

        self.commit(pass);
        self.flush()
    }

    /// Re-render dirty instances until the tree settles.
    pub fn flush(&mut self) -> Result<()> {
        for pass_no in 0.. {
            let dirty = std::mem::take(&mut *self.queue.dirty.lock());
            if dirty.is_empty() {
                return Ok(());
            }
            if pass_no == self.config.max_render_passes {
                tracing::warn!(limit = pass_no, pending = dirty.len(), "render loop aborted");
                return Err(RenderError::RenderLoop { limit: pass_no });
            }

            let mut targets: Vec<(usize, Arc<Mutex<Instance>>)> = dirty
                .iter()
                .filter_map(|id| self.queue.live.get(id).map(|entry| entry.value().clone()))
                .map(|instance| {
                    let depth = instance.lock().depth;
                    (depth, instance)
                })
                .collect();
            targets.sort_by_key(|(depth, _)| *depth);

            tracing::debug!(pass = pass_no, dirty = targets.len(), "render pass");
            // A failing target keeps its last output; the rest of the pass still commits.
            let mut pass = Pass::default();
            let mut first_error = None;
            for (_, instance) in targets {
                let id = instance.lock().id;
                if pass.rendered.contains(&id) || !self.queue.live.contains_key(&id) {
                    continue;
                }
                if let Err(err) = self.render_instance(&instance, &mut pass) {
                    tracing::warn!(instance = ?id, error = %err, "render failed");
                    first_error.get_or_insert(err);
                }
            }
            self.commit(pass);
            if let Some(err) = first_error {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Run `f`, then flush whatever updates it scheduled.
    pub fn act<R>(&mut self, f: impl FnOnce() -> R) -> Result<R> {
        let value = f();
        self.flush()?;
        Ok(value)
    }

    /// Unmount the whole tree, running every cleanup.
    pub fn unmount(&mut self) {
        for child in std::mem::take(&mut self.children) {
            self.unmount_child(child);
        }
        self.queue.dirty.lock().clear();
    }

    /// Instances waiting for the next flush.
    pub fn pending_updates(&self) -> usize {
        self.queue.dirty.lock().len()
    }

    /// Currently mounted component instances.
    pub fn mounted_count(&self) -> usize {
        self.queue.live.len()
    }

    /// Concatenated text of the mounted tree.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Structured view of the mounted tree.
    pub fn snapshot(&self) -> Vec<Rendered> {
        snapshot_of(&self.children)
    }

    fn commit(&self, pass: Pass) {
        for effect in pass.effects {
            effect.commit();
        }
    }

    fn render_instance(&self, instance: &Arc<Mutex<Instance>>, pass: &mut Pass) -> Result<()> {
        let (id, depth, node, mut slots, mut effects, first_render) = {
            let mut inst = instance.lock();
            (
                inst.id,
                inst.depth,
                inst.node.clone(),
                std::mem::take(&mut inst.slots),
                std::mem::take(&mut inst.effects),
                inst.renders == 0,
            )
        };
        pass.rendered.insert(id);
        tracing::trace!(instance = ?id, component = node.name(), "render");

        let mut pending = Vec::new();
        let output = {
            let mut scope = Scope::new(
                node.name(),
                &mut slots,
                &mut effects,
                &mut pending,
                Updater::new(&self.queue, id),
                first_render,
            );
            // Render reads never subscribe anything; listeners go in at commit.
            untracked(|| node.render(&mut scope))
                .and_then(|output| scope.finish(self.config.strict_hooks).map(|()| output))
        };

        {
            let mut inst = instance.lock();
            inst.slots = slots;
            inst.effects = effects;
            inst.renders += 1;
        }
        let output = output?;

        let mut children = std::mem::take(&mut instance.lock().children);
        let result = self.reconcile(&mut children, output, depth + 1, pass);
        instance.lock().children = children;

        // Children queued theirs during reconcile, so they commit first.
        pass.effects.extend(pending);
        result
    }

    fn reconcile(
        &self,
        children: &mut Vec<Mounted>,
        node: Node,
        depth: usize,
        pass: &mut Pass,
    ) -> Result<()> {
        let mut next = Vec::new();
        node.flatten_into(&mut next);

        let mut previous = std::mem::take(children).into_iter();
        for child in next {
            match self.reconcile_one(previous.next(), child, depth, pass) {
                Ok(mounted) => children.push(mounted),
                Err(err) => {
                    for stale in previous {
                        self.unmount_child(stale);
                    }
                    return Err(err);
                }
            }
        }
        for stale in previous {
            self.unmount_child(stale);
        }
        Ok(())
    }

    fn reconcile_one(
        &self,
        previous: Option<Mounted>,
        child: Child,
        depth: usize,
        pass: &mut Pass,
    ) -> Result<Mounted> {
        match (previous, child) {
            (Some(Mounted::Component(instance)), Child::Component(node)) => {
                let same_type = instance.lock().node.component_type() == node.component_type();
                if !same_type {
                    self.unmount_child(Mounted::Component(instance));
                    return self.mount(node, depth, pass);
                }

                instance.lock().node = node;
                if let Err(err) = self.render_instance(&instance, pass) {
                    self.unmount_child(Mounted::Component(instance));
                    return Err(err);
                }
                Ok(Mounted::Component(instance))
            }
            (previous, child) => {
                if let Some(previous) = previous {
                    self.unmount_child(previous);
                }
                match child {
                    Child::Empty => Ok(Mounted::Empty),
                    Child::Text(text) => Ok(Mounted::Text(text)),
                    Child::Component(node) => self.mount(node, depth, pass),
                }
            }
        }
    }

    fn mount(&self, node: ComponentNode, depth: usize, pass: &mut Pass) -> Result<Mounted> {
        let id = InstanceId::next();
        tracing::debug!(instance = ?id, component = node.name(), depth, "mount");

        let instance = Arc::new(Mutex::new(Instance::new(id, depth, node)));
        self.queue.live.insert(id, instance.clone());

        if let Err(err) = self.render_instance(&instance, pass) {
            self.unmount_child(Mounted::Component(instance));
            return Err(err);
        }
        Ok(Mounted::Component(instance))
    }

    fn unmount_child(&self, mounted: Mounted) {
        let Mounted::Component(instance) = mounted else {
            return;
        };

        let (id, name, children, effects) = {
            let mut inst = instance.lock();
            (
                inst.id,
                inst.node.name(),
                std::mem::take(&mut inst.children),
                std::mem::take(&mut inst.effects),
            )
        };
        self.queue.live.remove(&id);
        self.queue.dirty.lock().shift_remove(&id);
        tracing::debug!(instance = ?id, component = name, "unmount");

        for effect in effects {
            let cleanup = {
                let mut slot = effect.lock();
                slot.unmounted = true;
                slot.cleanup.take()
            };
            if let Some(cleanup) = cleanup {
                cleanup();
            }
        }
        for child in children {
            self.unmount_child(child);
        }
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn collect_text(children: &[Mounted], out: &mut String) {
    for child in children {
        match child {
            Mounted::Empty => {}
            Mounted::Text(text) => out.push_str(text),
            Mounted::Component(instance) => collect_text(&instance.lock().children, out),
        }
    }
}

fn snapshot_of(children: &[Mounted]) -> Vec<Rendered> {
    children
        .iter()
        .filter_map(|child| match child {
            Mounted::Empty => None,
            Mounted::Text(text) => Some(Rendered::Text { text: text.clone() }),
            Mounted::Component(instance) => {
                let inst = instance.lock();
                Some(Rendered::Component {
                    name: inst.node.name().to_owned(),
                    children: snapshot_of(&inst.children),
                })
            }
        })
        .collect()
}
