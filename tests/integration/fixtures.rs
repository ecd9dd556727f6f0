//! Shared fixtures: an in-memory provider fake serving ZIP-packaged
//! datasets with realistic metadata sidecars.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use eumetsat_data_downloader::api::{ApiError, ApiResult, DataApi, SearchPage, SearchQuery};
use eumetsat_data_downloader::{Credentials, DatasetDescriptor};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const PRODUCT_ID: &str = "EO:EUM:DAT:MSG:MSG15-RSS";

/// Descriptor for the granule ending at minute `m` past 2020-06-01 12:00.
pub fn descriptor(minute: u32) -> DatasetDescriptor {
    let end = Utc
        .with_ymd_and_hms(2020, 6, 1, 12, minute, 15)
        .unwrap()
        .checked_add_signed(Duration::nanoseconds(883_000_000))
        .unwrap();
    let start = end - Duration::seconds(298);
    DatasetDescriptor {
        id: format!(
            "MSG3-SEVI-MSG15-0100-NA-{}Z-NA",
            end.format("%Y%m%d%H%M%S%.9f")
        ),
        collection_id: PRODUCT_ID.to_string(),
        start,
        end,
    }
}

/// Sidecar document matching the MSG15-RSS schema for one granule.
pub fn sidecar_xml(descriptor: &DatasetDescriptor) -> String {
    let begin = descriptor.start.format("%Y-%m-%dT%H:%M:%S%.9fZ");
    let end = descriptor.end.format("%Y-%m-%dT%H:%M:%S%.9fZ");
    let file_name = format!("{}.nat", descriptor.id);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<eum:EarthObservation
    xmlns:eum="http://www.eumetsat.int/sentinel"
    xmlns:om="http://www.opengis.net/om/2.0"
    xmlns:gml="http://www.opengis.net/gml/3.2"
    xmlns:eop="http://www.opengis.net/eop/2.1"
    xmlns:ows="http://www.opengis.net/ows/2.0"
    xmlns:xlink="http://www.w3.org/1999/xlink">
  <eum:metaDataProperty>
    <eum:EarthObservationMetaData>
      <eum:missingData uom="Percentage">0.0</eum:missingData>
    </eum:EarthObservationMetaData>
  </eum:metaDataProperty>
  <om:phenomenonTime>
    <gml:TimePeriod>
      <gml:beginPosition>{begin}</gml:beginPosition>
      <gml:endPosition>{end}</gml:endPosition>
    </gml:TimePeriod>
  </om:phenomenonTime>
  <om:resultTime>
    <gml:TimeInstant>
      <gml:timePosition>{end}</gml:timePosition>
    </gml:TimeInstant>
  </om:resultTime>
  <om:procedure>
    <eop:EarthObservationEquipment>
      <eop:platform>
        <eop:Platform>
          <eop:shortName>MSG3</eop:shortName>
          <eop:orbitType>GEO</eop:orbitType>
        </eop:Platform>
      </eop:platform>
      <eop:instrument>
        <eop:Instrument>
          <eop:shortName>SEVIRI</eop:shortName>
        </eop:Instrument>
      </eop:instrument>
      <eop:sensor>
        <eop:Sensor>
          <eop:operationalMode>RSS</eop:operationalMode>
        </eop:Sensor>
      </eop:sensor>
    </eop:EarthObservationEquipment>
  </om:procedure>
  <om:featureOfInterest>
    <eop:Footprint>
      <eop:centerOf>
        <gml:Point srsName="EPSG:4326">
          <gml:pos>9.5 0.0</gml:pos>
        </gml:Point>
      </eop:centerOf>
    </eop:Footprint>
  </om:featureOfInterest>
  <om:result>
    <eop:EarthObservationResult>
      <eop:product>
        <eop:ProductInformation>
          <eop:fileName>
            <ows:ServiceReference xlink:href="{file_name}"/>
          </eop:fileName>
          <eop:size uom="KB">102210</eop:size>
        </eop:ProductInformation>
      </eop:product>
    </eop:EarthObservationResult>
  </om:result>
</eum:EarthObservation>"#
    )
}

/// ZIP-package one granule the way the provider does: payload plus the two
/// XML sidecars.
pub fn zip_dataset(descriptor: &DatasetDescriptor) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer
        .start_file(format!("{}.nat", descriptor.id), options)
        .unwrap();
    writer.write_all(b"native payload bytes").unwrap();

    writer.start_file("EOPMetadata.xml", options).unwrap();
    writer.write_all(sidecar_xml(descriptor).as_bytes()).unwrap();

    writer.start_file("manifest.xml", options).unwrap();
    writer.write_all(b"<manifest/>").unwrap();

    writer.finish().unwrap().into_inner()
}

/// In-memory provider fake with a revocable-token model: downloads made
/// with anything other than the newest issued token are rejected the way
/// the real API rejects expired tokens.
pub struct FakeEumetsat {
    datasets: Vec<DatasetDescriptor>,
    token_requests: AtomicUsize,
    download_requests: AtomicUsize,
    current_token: Mutex<String>,
    fail_ids: HashSet<String>,
    revoke_before_first_download: AtomicBool,
}

impl FakeEumetsat {
    pub fn new(datasets: Vec<DatasetDescriptor>) -> Self {
        Self {
            datasets,
            token_requests: AtomicUsize::new(0),
            download_requests: AtomicUsize::new(0),
            current_token: Mutex::new(String::new()),
            fail_ids: HashSet::new(),
            revoke_before_first_download: AtomicBool::new(false),
        }
    }

    /// Expire the first minted token right before the first download, as
    /// happens when a token ages out between search and transfer.
    pub fn with_expiring_first_token(self) -> Self {
        self.revoke_before_first_download.store(true, Ordering::SeqCst);
        self
    }

    /// Make every download of `id` fail with a transfer error.
    pub fn failing_on(mut self, id: &str) -> Self {
        self.fail_ids.insert(id.to_string());
        self
    }

    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    pub fn download_requests(&self) -> usize {
        self.download_requests.load(Ordering::SeqCst)
    }

    /// Invalidate the outstanding token, as the provider does on expiry.
    pub fn revoke_current_token(&self) {
        self.current_token.lock().unwrap().clear();
    }
}

#[async_trait]
impl DataApi for FakeEumetsat {
    async fn request_token(&self, _credentials: &Credentials) -> ApiResult<String> {
        let serial = self.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("token-{serial}");
        *self.current_token.lock().unwrap() = token.clone();
        Ok(token)
    }

    async fn search_page(&self, query: &SearchQuery) -> ApiResult<SearchPage> {
        let mut matching: Vec<DatasetDescriptor> = self
            .datasets
            .iter()
            .filter(|d| d.start >= query.start && d.end <= query.end)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.start.cmp(&a.start).then(b.id.cmp(&a.id)));
        let total_results = matching.len();
        matching.truncate(query.count);
        Ok(SearchPage {
            total_results,
            features: matching,
        })
    }

    async fn download_dataset(
        &self,
        _collection_id: &str,
        dataset_id: &str,
        access_token: &str,
    ) -> ApiResult<Bytes> {
        self.download_requests.fetch_add(1, Ordering::SeqCst);

        if self
            .revoke_before_first_download
            .swap(false, Ordering::SeqCst)
        {
            self.revoke_current_token();
        }
        if *self.current_token.lock().unwrap() != access_token {
            return Err(ApiError::InvalidCredentials);
        }
        if self.fail_ids.contains(dataset_id) {
            return Err(ApiError::Transfer {
                status: 500,
                body: "internal error".to_string(),
            });
        }

        let descriptor = self
            .datasets
            .iter()
            .find(|d| d.id == dataset_id)
            .ok_or_else(|| ApiError::Transfer {
                status: 404,
                body: format!("no such dataset {dataset_id}"),
            })?;
        Ok(Bytes::from(zip_dataset(descriptor)))
    }
}

/// Timestamps bracketing the granules produced by [`descriptor`].
pub fn query_range() -> (DateTime<Utc>, DateTime<Utc>) {
    (
        Utc.with_ymd_and_hms(2020, 6, 1, 11, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2020, 6, 1, 13, 0, 0).unwrap(),
    )
}
