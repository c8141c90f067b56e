use grocery_core::db::LocalCache;
use grocery_core::repo::RepoError;
use grocery_core::service::document_service::DocumentService;
use grocery_core::service::ServiceError;
use std::path::Path;
use std::sync::Arc;

fn service(dir: &Path) -> DocumentService {
    let cache = Arc::new(LocalCache::open_in_memory().unwrap());
    DocumentService::new(cache, dir.join("documents"))
}

#[tokio::test]
async fn import_copies_file_under_fresh_name() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("boleta.pdf");
    std::fs::write(&source, b"%PDF-1.4 boleta").unwrap();
    let documents = service(dir.path());

    let first = documents.import(&source, "Boleta octubre").await.unwrap();
    let second = documents.import(&source, "").await.unwrap();

    assert_eq!(first.display_name, "Boleta octubre");
    assert_eq!(second.display_name, "boleta.pdf");
    assert_ne!(first.local_uri, second.local_uri);
    assert!(Path::new(&first.local_uri).starts_with(documents.documents_dir()));
    assert!(first.local_uri.ends_with(".pdf"));
    assert_eq!(std::fs::read(&first.local_uri).unwrap(), b"%PDF-1.4 boleta");
    assert!(source.exists());
    assert_eq!(documents.list().unwrap().len(), 2);
}

#[tokio::test]
async fn missing_source_inserts_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let documents = service(dir.path());

    let err = documents
        .import(dir.path().join("no-existe.txt"), "Nada")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Io(_)));
    assert!(documents.list().unwrap().is_empty());
}

#[tokio::test]
async fn delete_removes_row_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("foto.jpg");
    std::fs::write(&source, b"jpeg").unwrap();
    let documents = service(dir.path());
    let imported = documents.import(&source, "Foto").await.unwrap();

    documents.delete(imported.id).await.unwrap();
    assert!(documents.get(imported.id).unwrap().is_none());
    assert!(!Path::new(&imported.local_uri).exists());

    let err = documents.delete(imported.id).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::NotFound { entity: "document", .. })
    ));
}

#[tokio::test]
async fn delete_tolerates_already_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("nota.txt");
    std::fs::write(&source, b"hola").unwrap();
    let documents = service(dir.path());
    let imported = documents.import(&source, "Nota").await.unwrap();

    std::fs::remove_file(&imported.local_uri).unwrap();
    documents.delete(imported.id).await.unwrap();
    assert!(documents.list().unwrap().is_empty());
}
