//! 回忆树服务
//!
//! 每对用户一棵树，第一次打开时创建并带上默认分支。只有树的两位成员可以读写。

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::memory_tree::DEFAULT_BRANCH_NAME;
use crate::models::{
    ImageUpload, MEMORIES_TABLE, MEMORY_BRANCHES_TABLE, MEMORY_TREES_TABLE, Memory, MemoryBranch,
    MemoryTree,
};
use crate::storage::{BlobStore, Direction, Query, RecordStore, either_pair};

/// 新回忆
#[derive(Debug, Clone, Default)]
pub struct NewMemory {
    pub title: String,
    pub description: Option<String>,
    pub image: Option<ImageUpload>,
}

/// 回忆树服务 trait
#[async_trait]
pub trait MemoryTreeService: Send + Sync {
    /// 两人之间的树（任一方向），带分支和回忆
    async fn get_tree(&self, user_id: &str, other_id: &str) -> Result<Option<MemoryTree>>;

    /// 获取或创建两人之间的树
    async fn open(&self, user_id: &str, other_id: &str) -> Result<MemoryTree>;

    /// 新增分支
    async fn add_branch(&self, user_id: &str, tree_id: &str, name: &str) -> Result<MemoryBranch>;

    /// 新增回忆；图片上传失败时不带图片保存
    async fn add_memory(
        &self,
        user_id: &str,
        tree_id: &str,
        branch_id: &str,
        memory: NewMemory,
    ) -> Result<Memory>;
}

/// 回忆树服务实现
pub struct MemoryTreeServiceImpl {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    image_bucket: String,
}

impl MemoryTreeServiceImpl {
    pub fn new(store: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>, image_bucket: &str) -> Self {
        Self {
            store,
            blobs,
            image_bucket: image_bucket.to_string(),
        }
    }

    /// 读取树并校验成员身份
    async fn tree_for(&self, user_id: &str, tree_id: &str) -> Result<MemoryTree> {
        let tree: MemoryTree = self
            .store
            .fetch_one(&Query::table(MEMORY_TREES_TABLE).eq("id", tree_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Memory tree {} not found", tree_id)))?;
        if !tree.involves(user_id) {
            return Err(AppError::Authorization(format!(
                "User {} is not part of memory tree {}",
                user_id, tree_id
            )));
        }
        Ok(tree)
    }

    async fn load(&self, mut tree: MemoryTree) -> Result<MemoryTree> {
        let branches = Query::table(MEMORY_BRANCHES_TABLE)
            .eq("memory_tree_id", tree.id.as_str())
            .order_by("created_at", Direction::Asc);
        let memories = Query::table(MEMORIES_TABLE)
            .eq("memory_tree_id", tree.id.as_str())
            .order_by("created_at", Direction::Asc);

        let (mut branches, memories): (Vec<MemoryBranch>, Vec<Memory>) =
            tokio::try_join!(self.store.fetch(&branches), self.store.fetch(&memories))?;

        for memory in memories {
            match branches.iter_mut().find(|b| b.id == memory.memory_branch_id) {
                Some(branch) => branch.memories.push(memory),
                None => tracing::warn!(
                    "Memory {} references unknown branch {}",
                    memory.id,
                    memory.memory_branch_id
                ),
            }
        }
        tree.branches = branches;
        Ok(tree)
    }

    async fn insert_branch(&self, tree_id: &str, name: &str) -> Result<MemoryBranch> {
        let row = json!({ "memory_tree_id": tree_id, "name": name });
        self.store.create(MEMORY_BRANCHES_TABLE, &row).await
    }

    async fn upload_image(&self, tree_id: &str, branch_id: &str, image: ImageUpload) -> Option<String> {
        let path = format!(
            "{}/{}/{}.{}",
            tree_id,
            branch_id,
            Utc::now().timestamp_millis(),
            image.extension
        );
        match self
            .blobs
            .upload(&self.image_bucket, &path, &image.content_type, image.bytes)
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Memory image upload failed, saving without image: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl MemoryTreeService for MemoryTreeServiceImpl {
    async fn get_tree(&self, user_id: &str, other_id: &str) -> Result<Option<MemoryTree>> {
        let query = Query::table(MEMORY_TREES_TABLE).any_of(either_pair(
            "user_id_1",
            "user_id_2",
            user_id,
            other_id,
        ));
        match self.store.fetch_one::<MemoryTree>(&query).await? {
            Some(tree) => self.load(tree).await.map(Some),
            None => Ok(None),
        }
    }

    async fn open(&self, user_id: &str, other_id: &str) -> Result<MemoryTree> {
        if user_id == other_id {
            return Err(AppError::Validation(
                "A memory tree needs two different people".to_string(),
            ));
        }
        if let Some(tree) = self.get_tree(user_id, other_id).await? {
            return Ok(tree);
        }

        let row = json!({ "user_id_1": user_id, "user_id_2": other_id });
        let mut tree: MemoryTree = self.store.create(MEMORY_TREES_TABLE, &row).await?;
        let branch = self.insert_branch(&tree.id, DEFAULT_BRANCH_NAME).await?;
        tracing::info!("Created memory tree {} for {} and {}", tree.id, user_id, other_id);

        tree.branches = vec![branch];
        Ok(tree)
    }

    async fn add_branch(&self, user_id: &str, tree_id: &str, name: &str) -> Result<MemoryBranch> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Branch name cannot be empty".to_string()));
        }
        self.tree_for(user_id, tree_id).await?;
        self.insert_branch(tree_id, name).await
    }

    async fn add_memory(
        &self,
        user_id: &str,
        tree_id: &str,
        branch_id: &str,
        memory: NewMemory,
    ) -> Result<Memory> {
        let title = memory.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Memory title cannot be empty".to_string()));
        }
        self.tree_for(user_id, tree_id).await?;

        let branch_exists = self
            .store
            .exists(
                &Query::table(MEMORY_BRANCHES_TABLE)
                    .eq("id", branch_id)
                    .eq("memory_tree_id", tree_id),
            )
            .await?;
        if !branch_exists {
            return Err(AppError::NotFound(format!(
                "Branch {} not found in memory tree {}",
                branch_id, tree_id
            )));
        }

        let image_url = match memory.image {
            Some(image) => self.upload_image(tree_id, branch_id, image).await,
            None => None,
        };

        let row = json!({
            "memory_branch_id": branch_id,
            "memory_tree_id": tree_id,
            "title": title,
            "description": memory.description.as_deref().map(str::trim).filter(|d| !d.is_empty()),
            "image_url": image_url,
            "created_by": user_id,
        });
        self.store.create(MEMORIES_TABLE, &row).await
    }
}

/// 创建回忆树服务
pub fn create_memory_tree_service(
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    image_bucket: &str,
) -> Box<dyn MemoryTreeService> {
    Box::new(MemoryTreeServiceImpl::new(store, blobs, image_bucket))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBlobStore, MemoryStore};

    /// 总是失败的对象存储
    struct BrokenBlobs;

    #[async_trait]
    impl BlobStore for BrokenBlobs {
        async fn upload(&self, _: &str, _: &str, _: &str, _: Vec<u8>) -> Result<String> {
            Err(AppError::Upstream("bucket unavailable".into()))
        }

        fn public_url(&self, bucket: &str, path: &str) -> String {
            format!("broken://{}/{}", bucket, path)
        }
    }

    fn service_with(blobs: Arc<dyn BlobStore>) -> MemoryTreeServiceImpl {
        MemoryTreeServiceImpl::new(Arc::new(MemoryStore::new()), blobs, "memory_images")
    }

    fn service() -> MemoryTreeServiceImpl {
        service_with(Arc::new(MemoryBlobStore::new()))
    }

    fn memory(title: &str, image: Option<ImageUpload>) -> NewMemory {
        NewMemory {
            title: title.into(),
            description: Some("  ".into()),
            image,
        }
    }

    #[tokio::test]
    async fn test_open_creates_once_with_default_branch() {
        let service = service();
        assert!(service.get_tree("a", "b").await.unwrap().is_none());

        let tree = service.open("a", "b").await.unwrap();
        assert_eq!(tree.branches.len(), 1);
        assert_eq!(tree.branches[0].name, DEFAULT_BRANCH_NAME);

        // 反向打开得到同一棵树
        let again = service.open("b", "a").await.unwrap();
        assert_eq!(again.id, tree.id);
        assert_eq!(again.branches.len(), 1);
    }

    #[tokio::test]
    async fn test_only_participants_can_write() {
        let service = service();
        let tree = service.open("a", "b").await.unwrap();
        assert!(matches!(
            service.add_branch("c", &tree.id, "Trips").await,
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            service.add_branch("a", &tree.id, "  ").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.add_branch("a", "missing", "Trips").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_memories_grouped_by_branch_in_order() {
        let service = service();
        let tree = service.open("a", "b").await.unwrap();
        let first = tree.branches[0].id.clone();
        let trips = service.add_branch("b", &tree.id, "Trips").await.unwrap();

        service
            .add_memory("a", &tree.id, &first, memory("Coffee", None))
            .await
            .unwrap();
        service
            .add_memory("b", &tree.id, &trips.id, memory("Lisbon", None))
            .await
            .unwrap();
        service
            .add_memory("a", &tree.id, &first, memory("Walk", None))
            .await
            .unwrap();

        let loaded = service.get_tree("b", "a").await.unwrap().unwrap();
        assert_eq!(loaded.memory_count(), 3);
        let titles: Vec<&str> = loaded.branches[0]
            .memories
            .iter()
            .map(|m| m.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Coffee", "Walk"]);
        assert_eq!(loaded.branches[1].memories[0].created_by, "b");
        assert_eq!(loaded.branches[0].memories[0].description, None);
    }

    #[tokio::test]
    async fn test_memory_with_image() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let service = service_with(blobs.clone());
        let tree = service.open("a", "b").await.unwrap();
        let branch = tree.branches[0].id.clone();

        let image = ImageUpload::from_file_name("beach.jpg", "image/jpeg", vec![9, 9]);
        let saved = service
            .add_memory("a", &tree.id, &branch, memory("Beach", Some(image)))
            .await
            .unwrap();
        let url = saved.image_url.unwrap();
        assert!(url.starts_with(&format!("memory://memory_images/{}/{}/", tree.id, branch)));
        assert_eq!(blobs.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_saves_without_image() {
        let service = service_with(Arc::new(BrokenBlobs));
        let tree = service.open("a", "b").await.unwrap();
        let branch = tree.branches[0].id.clone();

        let image = ImageUpload::from_file_name("x.png", "image/png", vec![1]);
        let saved = service
            .add_memory("b", &tree.id, &branch, memory("Concert", Some(image)))
            .await
            .unwrap();
        assert_eq!(saved.title, "Concert");
        assert!(saved.image_url.is_none());
    }

    #[tokio::test]
    async fn test_unknown_branch() {
        let service = service();
        let tree = service.open("a", "b").await.unwrap();
        assert!(matches!(
            service
                .add_memory("a", &tree.id, "nope", memory("x", None))
                .await,
            Err(AppError::NotFound(_))
        ));
    }
}
