//! End-to-end pipeline tests: upload → ingest → retrieve → generate.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use studybase::completion::CompletionClient;
use studybase::config::{ChunkingConfig, RetrievalConfig};
use studybase::generate::{run_generation, GenerationRequest};
use studybase::ingest::{process_document, IngestQueue};
use studybase::models::{Document, DocumentStatus};
use studybase::retrieve::retrieve_chunks;
use studybase::store::memory::{InMemoryStore, MemoryByteStore};
use studybase::store::sqlite::SqliteStore;
use studybase::store::{delete_document_cascade, FsByteStore, Store};

/// Completion stub that records the prompt and returns a fixed answer.
struct EchoClient {
    prompts: Mutex<Vec<String>>,
}

impl EchoClient {
    fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl CompletionClient for EchoClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("讲解完成".to_string())
    }
}

fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
        body
    );
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        writer
            .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    buf
}

async fn wait_for_terminal(store: &dyn Store, id: &str) -> Document {
    for _ in 0..200 {
        let doc = store.get_document(id).await.unwrap().unwrap();
        if matches!(
            doc.status,
            DocumentStatus::Completed | DocumentStatus::Failed
        ) {
            return doc;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("document {} never reached a terminal status", id);
}

#[tokio::test]
async fn docx_upload_grounds_a_generation_request() {
    let store = Arc::new(InMemoryStore::new());
    let bytes = Arc::new(MemoryByteStore::new());
    bytes.insert(
        "u1/教案.docx",
        docx_bytes(&["今天学习分数的认识和分数加法", "课后请完成练习册第三页"]),
    );

    let doc = Document::new(
        "u1",
        "教案.docx",
        0,
        studybase::extract::MIME_DOCX,
        "u1/教案.docx",
    );
    let doc_id = doc.id.clone();
    store.insert_document(&doc).await.unwrap();

    let queue = IngestQueue::spawn(
        store.clone(),
        bytes.clone(),
        ChunkingConfig::default(),
        2,
    );
    queue.enqueue(&doc_id).unwrap();

    let doc = wait_for_terminal(store.as_ref(), &doc_id).await;
    assert_eq!(doc.status, DocumentStatus::Completed);
    assert_eq!(doc.chunk_count, 1); // both paragraphs fit one 800-char chunk
    assert!(doc
        .text_content
        .as_deref()
        .unwrap()
        .contains("分数的认识"));

    let client = EchoClient::new();
    let outcome = run_generation(
        store.as_ref(),
        &client,
        &RetrievalConfig::default(),
        &GenerationRequest {
            document_ids: vec![doc_id],
            query: "分数教学".to_string(),
            prompt: "请写一份分数教学导入".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome.text, "讲解完成");
    let prompt = client.last_prompt();
    assert!(prompt.contains("[Source: 教案.docx]"));
    assert!(prompt.contains("分数的认识"));
    assert!(prompt.ends_with("请写一份分数教学导入"));
    assert_eq!(outcome.snapshots.len(), 1);
    assert!(outcome.snapshots[0].score > 0.0);
}

#[tokio::test]
async fn long_cjk_document_chunks_with_overlap_end_to_end() {
    let store = InMemoryStore::new();
    let bytes = MemoryByteStore::new();
    bytes.insert("k1", "教师评语示例。".repeat(200).into_bytes());

    let doc = Document::new("u1", "评语.txt", 1400 * 3, "text/plain", "k1");
    let id = doc.id.clone();
    store.insert_document(&doc).await.unwrap();
    process_document(&store, &bytes, &ChunkingConfig::default(), &id)
        .await
        .unwrap();

    let mut chunks = store.chunks_for_documents(&[id]).await.unwrap();
    chunks.sort_by_key(|c| c.chunk_index);
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].content.ends_with('。'));
    assert!(chunks[1].content.ends_with('。'));
    // the second chunk re-covers the first chunk's tail by at most 100 chars
    let tail: String = chunks[0]
        .content
        .chars()
        .skip(chunks[0].content.chars().count() - 100)
        .collect();
    assert!(chunks[1].content.starts_with(&tail));
}

#[tokio::test]
async fn relevant_document_outranks_unrelated_one() {
    let store = InMemoryStore::new();
    let bytes = MemoryByteStore::new();
    bytes.insert("k-math", "今天学习分数的认识和分数加法".as_bytes().to_vec());
    bytes.insert("k-sport", "体育课游泳训练".as_bytes().to_vec());

    let mut ids = Vec::new();
    let mut names = HashMap::new();
    for (key, name) in [("k-math", "数学.txt"), ("k-sport", "体育.txt")] {
        let doc = Document::new("u1", name, 0, "text/plain", key);
        ids.push(doc.id.clone());
        names.insert(doc.id.clone(), name.to_string());
        store.insert_document(&doc).await.unwrap();
        process_document(&store, &bytes, &ChunkingConfig::default(), &doc.id)
            .await
            .unwrap();
    }

    let got = retrieve_chunks(
        &store,
        &ids,
        &names,
        "分数教学",
        &RetrievalConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(got.len(), 1);
    assert_eq!(got[0].document_name, "数学.txt");
    assert!(got[0].score > 0.0);
}

#[tokio::test]
async fn disjoint_query_still_receives_sampled_grounding() {
    let store = InMemoryStore::new();
    let bytes = MemoryByteStore::new();
    bytes.insert("k1", "古诗词鉴赏要点整理".as_bytes().to_vec());

    let doc = Document::new("u1", "语文.txt", 0, "text/plain", "k1");
    let id = doc.id.clone();
    store.insert_document(&doc).await.unwrap();
    process_document(&store, &bytes, &ChunkingConfig::default(), &id)
        .await
        .unwrap();

    let client = EchoClient::new();
    let outcome = run_generation(
        &store,
        &client,
        &RetrievalConfig::default(),
        &GenerationRequest {
            document_ids: vec![id],
            query: "fraction homework".to_string(),
            prompt: "write a worksheet".to_string(),
        },
    )
    .await
    .unwrap();

    // no lexical overlap, but the fallback sample still grounds the prompt
    assert!(client.last_prompt().contains("古诗词鉴赏要点整理"));
    assert_eq!(outcome.snapshots.len(), 1);
    assert_eq!(outcome.snapshots[0].score, 0.0);
}

#[tokio::test]
async fn sqlite_backed_flow_ingests_retrieves_and_deletes() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = SqliteStore::connect(&tmp.path().join("data/studybase.sqlite"))
        .await
        .unwrap();
    store.run_migrations().await.unwrap();

    let files = tmp.path().join("files");
    std::fs::create_dir_all(&files).unwrap();
    std::fs::write(files.join("notes.txt"), "今天学习分数的认识和分数加法").unwrap();
    let bytes = FsByteStore::new(&files);

    let doc = Document::new("u1", "notes.txt", 0, "text/plain", "notes.txt");
    let id = doc.id.clone();
    store.insert_document(&doc).await.unwrap();
    process_document(&store, &bytes, &ChunkingConfig::default(), &id)
        .await
        .unwrap();

    let stored = store.get_document(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, DocumentStatus::Completed);
    assert_eq!(stored.chunk_count, 1);

    let names = HashMap::from([(id.clone(), "notes.txt".to_string())]);
    let got = retrieve_chunks(
        &store,
        &[id.clone()],
        &names,
        "分数",
        &RetrievalConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(got.len(), 1);
    assert!(got[0].score > 0.0);

    delete_document_cascade(&store, &id).await.unwrap();
    assert!(store.get_document(&id).await.unwrap().is_none());
    assert!(store
        .chunks_for_documents(&[id])
        .await
        .unwrap()
        .is_empty());

    store.close().await;
}
