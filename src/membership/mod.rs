//! Cluster view used to fan propagation out to peers.


#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;
use tracing::info;

#[cfg_attr(test, automock)]
pub trait ClusterMembers: Send + Sync + 'static {
    /// Address of this node
    fn self_address(&self) -> String;

    /// All member addresses except this node
    fn peers(&self) -> Vec<String>;
}

/// Member list fixed at construction, replaceable through [`StaticMembers::update`].
#[derive(Debug)]
pub struct StaticMembers {
    self_address: String,
    members: RwLock<Vec<String>>,
}

impl StaticMembers {
    /// `members` may or may not contain `self_address`
    pub fn new(
        self_address: impl Into<String>,
        members: Vec<String>,
    ) -> Self {
        let self_address = self_address.into();
        let members = normalize(&self_address, members);
        Self {
            self_address,
            members: RwLock::new(members),
        }
    }

    /// Single node cluster
    pub fn standalone(self_address: impl Into<String>) -> Self {
        Self::new(self_address, Vec::new())
    }

    pub fn update(
        &self,
        members: Vec<String>,
    ) {
        let members = normalize(&self.self_address, members);
        info!(peers = ?members, "cluster members updated");
        *self.members.write() = members;
    }
}

impl ClusterMembers for StaticMembers {
    fn self_address(&self) -> String {
        self.self_address.clone()
    }

    fn peers(&self) -> Vec<String> {
        self.members.read().clone()
    }
}

fn normalize(
    self_address: &str,
    mut members: Vec<String>,
) -> Vec<String> {
    members.retain(|m| !m.is_empty() && m != self_address);
    members.sort();
    members.dedup();
    members
}
